//! Qwen TTS realtime events.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// Client events
pub const EVENT_TYPE_SESSION_UPDATE: &str = "session.update";
pub const EVENT_TYPE_INPUT_TEXT_APPEND: &str = "input_text_buffer.append";
pub const EVENT_TYPE_INPUT_TEXT_COMMIT: &str = "input_text_buffer.commit";
pub const EVENT_TYPE_INPUT_TEXT_CLEAR: &str = "input_text_buffer.clear";
pub const EVENT_TYPE_SESSION_FINISH: &str = "session.finish";

// Server events
pub const EVENT_TYPE_SESSION_CREATED: &str = "session.created";
pub const EVENT_TYPE_SESSION_UPDATED: &str = "session.updated";
pub const EVENT_TYPE_INPUT_TEXT_COMMITTED: &str = "input_text_buffer.committed";
pub const EVENT_TYPE_RESPONSE_CREATED: &str = "response.created";
pub const EVENT_TYPE_RESPONSE_AUDIO_DELTA: &str = "response.audio.delta";
pub const EVENT_TYPE_RESPONSE_AUDIO_DONE: &str = "response.audio.done";
pub const EVENT_TYPE_RESPONSE_DONE: &str = "response.done";
pub const EVENT_TYPE_SESSION_FINISHED: &str = "session.finished";
pub const EVENT_TYPE_ERROR: &str = "error";

/// Event received on a TTS session.
#[derive(Debug, Clone, Default)]
pub struct TtsEvent {
    pub event_type: String,
    pub event_id: Option<String>,
    /// `session.id` for session events.
    pub session_id: Option<String>,
    /// `response.id` for response events.
    pub response_id: Option<String>,
    /// Decoded PCM for `response.audio.delta`.
    pub audio: Option<Vec<u8>>,
    pub error: Option<EventError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventError {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TtsEvent {
    /// Parses a server text frame. Audio deltas are base64-decoded.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        let str_at = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

        let mut event = TtsEvent {
            event_type: str_at(raw.get("type")).unwrap_or_default(),
            event_id: str_at(raw.get("event_id")),
            ..Default::default()
        };

        match event.event_type.as_str() {
            EVENT_TYPE_SESSION_CREATED | EVENT_TYPE_SESSION_UPDATED => {
                event.session_id = str_at(raw.get("session").and_then(|s| s.get("id")));
            }
            EVENT_TYPE_RESPONSE_CREATED | EVENT_TYPE_RESPONSE_DONE => {
                event.response_id = str_at(raw.get("response").and_then(|r| r.get("id")));
            }
            EVENT_TYPE_RESPONSE_AUDIO_DELTA => {
                event.response_id = str_at(raw.get("response_id"));
                if let Some(delta) = raw.get("delta").and_then(Value::as_str) {
                    event.audio = Some(base64::engine::general_purpose::STANDARD.decode(delta)?);
                }
            }
            EVENT_TYPE_ERROR => {
                if let Some(err) = raw.get("error") {
                    event.error = serde_json::from_value(err.clone()).ok();
                }
            }
            _ => {}
        }

        Ok(event)
    }

    pub fn is_session_finished(&self) -> bool {
        self.event_type == EVENT_TYPE_SESSION_FINISHED
    }

    pub fn is_response_done(&self) -> bool {
        self.event_type == EVENT_TYPE_RESPONSE_DONE
    }

    pub fn is_error(&self) -> bool {
        self.event_type == EVENT_TYPE_ERROR
    }
}
