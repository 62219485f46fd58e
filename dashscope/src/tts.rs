//! Qwen TTS realtime (`qwen3-tts-flash-realtime`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::{
    client::ClientConfig,
    error::{Error, Result},
    event::*,
    types::{MODEL_QWEN3_TTS_FLASH_REALTIME, VOICE_LONGHUA},
    ws::{self, Incoming, generate_event_id, truncate_for_log},
};

/// Sample rate of the PCM the service returns.
pub const TTS_SAMPLE_RATE: u32 = 24000;

pub const MODE_SERVER_COMMIT: &str = "server_commit";
pub const MODE_COMMIT: &str = "commit";

/// `session.update` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsSessionConfig {
    pub voice: String,
    pub response_format: String,
    pub sample_rate: u32,
    /// `server_commit` lets the server segment text; `commit` waits for explicit commits.
    pub mode: String,
}

impl Default for TtsSessionConfig {
    fn default() -> Self {
        Self {
            voice: VOICE_LONGHUA.to_string(),
            response_format: "pcm".to_string(),
            sample_rate: TTS_SAMPLE_RATE,
            mode: MODE_SERVER_COMMIT.to_string(),
        }
    }
}

pub struct TtsService {
    config: Arc<ClientConfig>,
}

impl TtsService {
    pub(crate) fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// Connects a session for `model`, or the default TTS model when empty.
    pub async fn connect(&self, model: &str) -> Result<TtsSession> {
        let model = if model.is_empty() {
            MODEL_QWEN3_TTS_FLASH_REALTIME
        } else {
            model
        };
        let url = format!("{}?model={}", self.config.realtime_url, model);
        let conn = ws::connect(&self.config, &url).await?;
        Ok(TtsSession {
            write_tx: conn.write_tx,
            read_rx: conn.read_rx,
            _read_handle: conn.read_handle,
            _write_handle: conn.write_handle,
        })
    }

    /// Synthesizes `text` and returns 24 kHz mono 16-bit PCM.
    ///
    /// Sends the whole text in one append, finishes the session and collects
    /// audio deltas until `session.finished` or the socket closes.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let mut session = self.connect("").await?;
        let mut cfg = TtsSessionConfig::default();
        if !voice.is_empty() {
            cfg.voice = voice.to_string();
        }
        session.update_session(&cfg).await?;
        session.append_text(text).await?;
        session.finish().await?;

        let pcm = collect_audio(&mut session).await?;
        session.close().await;
        info!("tts synthesized {} bytes for {} chars", pcm.len(), text.chars().count());
        Ok(pcm)
    }
}

async fn collect_audio(session: &mut TtsSession) -> Result<Vec<u8>> {
    let mut pcm = Vec::new();
    while let Some(event) = session.recv().await {
        let event = event?;
        if let Some(audio) = event.audio {
            pcm.extend_from_slice(&audio);
            continue;
        }
        if event.is_error() {
            let err = event.error.unwrap_or_default();
            return Err(Error::api(
                err.code.unwrap_or_default(),
                err.message.unwrap_or_default(),
                0,
            ));
        }
        if event.is_session_finished() {
            break;
        }
    }
    Ok(pcm)
}

/// An open TTS session.
pub struct TtsSession {
    write_tx: mpsc::Sender<Message>,
    read_rx: mpsc::Receiver<Result<Incoming>>,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
}

impl TtsSession {
    pub async fn update_session(&self, cfg: &TtsSessionConfig) -> Result<()> {
        self.send_event(json!({
            "event_id": generate_event_id(),
            "type": EVENT_TYPE_SESSION_UPDATE,
            "session": cfg,
        }))
        .await
    }

    pub async fn append_text(&self, text: &str) -> Result<()> {
        self.send_event(json!({
            "event_id": generate_event_id(),
            "type": EVENT_TYPE_INPUT_TEXT_APPEND,
            "text": text,
        }))
        .await
    }

    /// Commits buffered text (only meaningful in `commit` mode).
    pub async fn commit(&self) -> Result<()> {
        self.send_event(json!({
            "event_id": generate_event_id(),
            "type": EVENT_TYPE_INPUT_TEXT_COMMIT,
        }))
        .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.send_event(json!({
            "event_id": generate_event_id(),
            "type": EVENT_TYPE_INPUT_TEXT_CLEAR,
        }))
        .await
    }

    /// Asks the server to flush remaining audio and end with `session.finished`.
    pub async fn finish(&self) -> Result<()> {
        self.send_event(json!({
            "event_id": generate_event_id(),
            "type": EVENT_TYPE_SESSION_FINISH,
        }))
        .await
    }

    /// Next server event. Binary frames are treated as raw audio.
    pub async fn recv(&mut self) -> Option<Result<TtsEvent>> {
        let incoming = self.read_rx.recv().await?;
        Some(incoming.and_then(|frame| match frame {
            Incoming::Text(text) => TtsEvent::parse(&text),
            Incoming::Binary(data) => Ok(TtsEvent {
                event_type: EVENT_TYPE_RESPONSE_AUDIO_DELTA.to_string(),
                audio: Some(data),
                ..Default::default()
            }),
        }))
    }

    pub async fn close(&self) {
        if self.write_tx.send(Message::Close(None)).await.is_err() {
            debug!("tts session already closed");
        }
    }

    async fn send_event(&self, event: serde_json::Value) -> Result<()> {
        let text = event.to_string();
        debug!("sending event: {}", truncate_for_log(&text, 500));
        self.write_tx
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| Error::SessionClosed)
    }
}
