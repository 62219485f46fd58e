//! Realtime multimodal dialog over the duplex task WebSocket.
//!
//! Every frame is an envelope:
//!
//! ```json
//! {"header": {"action": "run-task", "task_id": "...", "streaming": "duplex"},
//!  "payload": {"input": {"directive": "Start", ...}, "parameters": {...}}}
//! ```
//!
//! The server answers with `{"header": {"event": ...}, "payload": {"output": {"event": ...}}}`
//! where `payload.output.event` carries the dialog event (`Started`,
//! `DialogStateChanged`, `SpeechContent`, `RespondingContent`, ...). Synthesized
//! speech arrives as binary frames.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::{
    client::ClientConfig,
    error::{Error, Result},
    types::{MODEL_MULTIMODAL_DIALOG, VOICE_LONGXIAOCHUN_V2},
    ws::{self, Incoming, truncate_for_log},
};

pub const ACTION_RUN_TASK: &str = "run-task";
pub const ACTION_CONTINUE_TASK: &str = "continue-task";
pub const ACTION_FINISH_TASK: &str = "finish-task";

pub const DIRECTIVE_START: &str = "Start";
pub const DIRECTIVE_REQUEST_TO_RESPOND: &str = "RequestToRespond";
pub const DIRECTIVE_HEARTBEAT: &str = "HeartBeat";
pub const DIRECTIVE_STOP: &str = "Stop";

pub const STREAMING_DUPLEX: &str = "duplex";

/// Header of a client envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub action: String,
    pub task_id: String,
    pub streaming: String,
}

/// Client envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogRequest {
    pub header: RequestHeader,
    pub payload: Value,
}

/// Upstream (client to server) media settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamParams {
    #[serde(rename = "type")]
    pub upstream_type: String,
    pub mode: String,
    pub audio_format: String,
    pub sample_rate: u32,
}

impl Default for UpstreamParams {
    fn default() -> Self {
        Self {
            upstream_type: "AudioOnly".to_string(),
            mode: STREAMING_DUPLEX.to_string(),
            audio_format: "pcm".to_string(),
            sample_rate: 16000,
        }
    }
}

/// Downstream speech synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownstreamParams {
    pub voice: String,
    pub sample_rate: u32,
}

impl Default for DownstreamParams {
    fn default() -> Self {
        Self {
            voice: VOICE_LONGXIAOCHUN_V2.to_string(),
            sample_rate: 24000,
        }
    }
}

/// Everything the `Start` directive needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartParams {
    pub workspace_id: String,
    pub app_id: String,
    pub dialog_id: Option<String>,
    pub upstream: UpstreamParams,
    pub downstream: DownstreamParams,
    pub user_id: String,
    pub device_uuid: String,
}

impl DialogRequest {
    fn new(action: &str, task_id: &str, payload: Value) -> Self {
        Self {
            header: RequestHeader {
                action: action.to_string(),
                task_id: task_id.to_string(),
                streaming: STREAMING_DUPLEX.to_string(),
            },
            payload,
        }
    }

    /// `run-task` with the `Start` directive.
    pub fn start(task_id: &str, params: &StartParams) -> Self {
        Self::new(
            ACTION_RUN_TASK,
            task_id,
            json!({
                "task_group": "aigc",
                "task": "multimodal-generation",
                "function": "generation",
                "model": MODEL_MULTIMODAL_DIALOG,
                "input": {
                    "directive": DIRECTIVE_START,
                    "workspace_id": params.workspace_id,
                    "app_id": params.app_id,
                    "dialog_id": params.dialog_id,
                },
                "parameters": {
                    "upstream": params.upstream,
                    "downstream": params.downstream,
                    "client_info": {
                        "user_id": params.user_id,
                        "device": {"uuid": params.device_uuid},
                    },
                },
            }),
        )
    }

    /// `continue-task` asking the agent to answer a text prompt.
    pub fn request_to_respond(
        task_id: &str,
        dialog_id: Option<&str>,
        text: &str,
        images: Vec<Value>,
        biz_params: Value,
    ) -> Self {
        Self::new(
            ACTION_CONTINUE_TASK,
            task_id,
            json!({
                "input": {
                    "directive": DIRECTIVE_REQUEST_TO_RESPOND,
                    "dialog_id": dialog_id,
                    "type": "prompt",
                    "text": text,
                },
                "parameters": {
                    "images": images,
                    "biz_params": biz_params,
                },
            }),
        )
    }

    /// `continue-task` keep-alive.
    pub fn heartbeat(task_id: &str, dialog_id: Option<&str>) -> Self {
        Self::new(
            ACTION_CONTINUE_TASK,
            task_id,
            json!({"input": {"directive": DIRECTIVE_HEARTBEAT, "dialog_id": dialog_id}}),
        )
    }

    /// `finish-task` with the `Stop` directive.
    pub fn stop(task_id: &str, dialog_id: Option<&str>) -> Self {
        Self::new(
            ACTION_FINISH_TASK,
            task_id,
            json!({"input": {"directive": DIRECTIVE_STOP, "dialog_id": dialog_id}}),
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Dialog event name found at `payload.output.event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEventKind {
    Started,
    DialogStateChanged,
    SpeechContent,
    RespondingStarted,
    RespondingContent,
    RespondingEnded,
    HeartBeat,
    Stopped,
    Error,
    Other(String),
}

impl DialogEventKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "Started" => Self::Started,
            "DialogStateChanged" => Self::DialogStateChanged,
            "SpeechContent" => Self::SpeechContent,
            "RespondingStarted" => Self::RespondingStarted,
            "RespondingContent" => Self::RespondingContent,
            "RespondingEnded" => Self::RespondingEnded,
            "HeartBeat" => Self::HeartBeat,
            "Stopped" => Self::Stopped,
            "Error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A parsed server envelope. `raw` keeps the full JSON for proxies.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogEvent {
    pub kind: DialogEventKind,
    /// `header.event` (`task-started`, `result-generated`, `task-failed`, ...).
    pub header_event: Option<String>,
    pub task_id: Option<String>,
    /// `payload.output`, or `Null` when absent.
    pub output: Value,
    pub raw: Value,
}

impl DialogEvent {
    /// Parses a server text frame.
    ///
    /// A `task-failed` header without a dialog event is reported as
    /// [`DialogEventKind::Error`] with the header's error fields copied into `output`.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        let header = raw.get("header");
        let header_event = header
            .and_then(|h| h.get("event"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let task_id = header
            .and_then(|h| h.get("task_id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut output = raw
            .get("payload")
            .and_then(|p| p.get("output"))
            .cloned()
            .unwrap_or(Value::Null);

        let kind = match output.get("event").and_then(Value::as_str) {
            Some(name) => DialogEventKind::parse(name),
            None if header_event.as_deref() == Some("task-failed") => {
                let h = header.cloned().unwrap_or(Value::Null);
                output = json!({
                    "event": "Error",
                    "error_code": h.get("error_code"),
                    "error_message": h.get("error_message"),
                });
                DialogEventKind::Error
            }
            None => DialogEventKind::Other(header_event.clone().unwrap_or_default()),
        };

        Ok(Self {
            kind,
            header_event,
            task_id,
            output,
            raw,
        })
    }

    fn output_str(&self, key: &str) -> Option<&str> {
        self.output.get(key).and_then(Value::as_str)
    }

    pub fn dialog_id(&self) -> Option<&str> {
        self.output_str("dialog_id")
    }

    /// Listening / Thinking / Responding.
    pub fn state(&self) -> Option<&str> {
        self.output_str("state")
    }

    pub fn text(&self) -> Option<&str> {
        self.output_str("text")
    }

    pub fn spoken(&self) -> Option<&str> {
        self.output_str("spoken")
    }

    pub fn finished(&self) -> Option<bool> {
        self.output.get("finished").and_then(Value::as_bool)
    }

    /// Converts an `Error` event into [`Error::Api`].
    pub fn to_error(&self) -> Option<Error> {
        if self.kind != DialogEventKind::Error {
            return None;
        }
        let code = match self.output.get("error_code") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(v) => v.to_string(),
        };
        Some(Error::api(
            code,
            self.output_str("error_message").unwrap_or_default(),
            0,
        ))
    }
}

/// Message received on a dialog session.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogMessage {
    Event(DialogEvent),
    /// Synthesized PCM audio.
    Audio(Vec<u8>),
}

/// Dialog service.
pub struct DialogService {
    config: Arc<ClientConfig>,
}

impl DialogService {
    pub(crate) fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// Opens the inference WebSocket. No directive is sent; start with
    /// [`DialogRequest::start`].
    pub async fn connect(&self) -> Result<DialogSession> {
        let conn = ws::connect(&self.config, &self.config.inference_url).await?;
        Ok(DialogSession {
            sender: DialogSender {
                write_tx: conn.write_tx,
            },
            receiver: DialogReceiver {
                read_rx: conn.read_rx,
                _read_handle: conn.read_handle,
                _write_handle: conn.write_handle,
            },
        })
    }
}

/// An open dialog connection.
pub struct DialogSession {
    sender: DialogSender,
    receiver: DialogReceiver,
}

impl DialogSession {
    pub fn sender(&self) -> &DialogSender {
        &self.sender
    }

    pub async fn send(&self, req: &DialogRequest) -> Result<()> {
        self.sender.send(req).await
    }

    pub async fn recv(&mut self) -> Option<Result<DialogMessage>> {
        self.receiver.recv().await
    }

    /// Splits into independently owned halves for concurrent pumps.
    pub fn split(self) -> (DialogSender, DialogReceiver) {
        (self.sender, self.receiver)
    }
}

/// Write half. Clones share the same socket.
#[derive(Clone)]
pub struct DialogSender {
    write_tx: mpsc::Sender<Message>,
}

impl DialogSender {
    pub async fn send(&self, req: &DialogRequest) -> Result<()> {
        self.send_text(req.to_json()?).await
    }

    /// Sends a raw text frame.
    pub async fn send_text(&self, text: String) -> Result<()> {
        debug!("sending: {}", truncate_for_log(&text, 200));
        self.write_tx
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Sends PCM audio as a binary frame.
    pub async fn send_audio(&self, data: Vec<u8>) -> Result<()> {
        self.write_tx
            .send(Message::Binary(data.into()))
            .await
            .map_err(|_| Error::SessionClosed)
    }

    pub async fn close(&self) {
        if self.write_tx.send(Message::Close(None)).await.is_err() {
            debug!("dialog session already closed");
        }
    }
}

/// Read half.
pub struct DialogReceiver {
    read_rx: mpsc::Receiver<Result<Incoming>>,
    _read_handle: JoinHandle<()>,
    _write_handle: JoinHandle<()>,
}

impl DialogReceiver {
    /// Next raw frame, unparsed.
    pub async fn recv_raw(&mut self) -> Option<Result<Incoming>> {
        self.read_rx.recv().await
    }

    /// Next frame, with text parsed as a [`DialogEvent`].
    pub async fn recv(&mut self) -> Option<Result<DialogMessage>> {
        let incoming = self.read_rx.recv().await?;
        Some(incoming.and_then(|frame| match frame {
            Incoming::Text(text) => DialogEvent::parse(&text).map(DialogMessage::Event),
            Incoming::Binary(data) => Ok(DialogMessage::Audio(data)),
        }))
    }
}

/// A fresh task id (UUID v4).
pub fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
