//! The MCP bridge: a flat `{type, payload}` dialect in front of the
//! DashScope dialog envelope.
//!
//! ```text
//! client                         bridge                          DashScope
//! {type:"session_start",...} --> run-task / Start           -->
//! {type:"text_request",...}  --> continue-task / RequestToRespond -->
//!                            <-- {type:"llm_result",...}    <-- RespondingContent
//! binary audio               <-> binary audio               <->
//! ```

use dhagent_dashscope::dialog::{
    DIRECTIVE_START, DownstreamParams, StartParams, UpstreamParams,
};
use dhagent_dashscope::{DialogEvent, DialogEventKind, DialogRequest, dialog::new_task_id};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::McpConfig;
use crate::frame::Frame;
use crate::upstream::Connector;

pub const TYPE_SESSION_START: &str = "session_start";
pub const TYPE_TEXT_REQUEST: &str = "text_request";
pub const TYPE_HEARTBEAT: &str = "heartbeat";
pub const TYPE_SESSION_STOP: &str = "session_stop";

/// Prefix of the error sent to the client when the upstream session fails.
pub const UPSTREAM_ERROR_PREFIX: &str = "阿里云WS处理错误: ";

/// `{"type":"error","payload":{"message":...}}`
pub fn error_message(message: &str) -> Value {
    json!({"type": "error", "payload": {"message": message}})
}

async fn report_error(local_tx: &mpsc::Sender<Frame>, message: &str) {
    if local_tx.send(Frame::json(&error_message(message))).await.is_err() {
        debug!("mcp: client gone before error was reported: {}", message);
    }
}

fn short_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &id[..8])
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

fn u32_field(payload: &Value, key: &str) -> Option<u32> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// Builds `Start` parameters from a `session_start` payload, applying defaults.
pub fn start_params(payload: &Value, config: &McpConfig) -> StartParams {
    let up = UpstreamParams::default();
    let down = DownstreamParams::default();
    StartParams {
        workspace_id: config.workspace_id.clone(),
        app_id: config.app_id.clone(),
        dialog_id: str_field(payload, "dialog_id").map(str::to_string),
        upstream: UpstreamParams {
            upstream_type: str_field(payload, "upstream_type")
                .map(str::to_string)
                .unwrap_or(up.upstream_type),
            mode: str_field(payload, "mode").map(str::to_string).unwrap_or(up.mode),
            audio_format: str_field(payload, "audio_format")
                .map(str::to_string)
                .unwrap_or(up.audio_format),
            sample_rate: u32_field(payload, "sample_rate").unwrap_or(up.sample_rate),
        },
        downstream: DownstreamParams {
            voice: str_field(payload, "voice").map(str::to_string).unwrap_or(down.voice),
            sample_rate: u32_field(payload, "tts_sample_rate").unwrap_or(down.sample_rate),
        },
        user_id: str_field(payload, "user_id")
            .map(str::to_string)
            .unwrap_or_else(|| short_id("mcp_user")),
        device_uuid: str_field(payload, "device_uuid")
            .map(str::to_string)
            .unwrap_or_else(|| short_id("mcp_device")),
    }
}

/// Converts a client message into an upstream envelope. Unknown types yield `None`.
pub fn to_upstream(msg: &Value, task_id: &str, config: &McpConfig) -> Option<DialogRequest> {
    let empty = json!({});
    let payload = msg.get("payload").unwrap_or(&empty);
    let dialog_id = str_field(payload, "dialog_id");

    match msg.get("type").and_then(Value::as_str)? {
        TYPE_SESSION_START => Some(DialogRequest::start(task_id, &start_params(payload, config))),
        TYPE_TEXT_REQUEST => Some(DialogRequest::request_to_respond(
            task_id,
            dialog_id,
            str_field(payload, "text").unwrap_or_default(),
            payload
                .get("images")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            payload.get("biz_params").cloned().unwrap_or_else(|| json!({})),
        )),
        TYPE_HEARTBEAT => Some(DialogRequest::heartbeat(task_id, dialog_id)),
        TYPE_SESSION_STOP => Some(DialogRequest::stop(task_id, dialog_id)),
        _ => None,
    }
}

/// Converts an upstream event into a client message. Unmapped events yield `None`.
pub fn from_upstream(event: &DialogEvent, task_id: &str) -> Option<Value> {
    let output = &event.output;
    let field = |k: &str| output.get(k).cloned().unwrap_or(Value::Null);
    let dialog_id = field("dialog_id");

    let (kind, payload) = match event.kind {
        DialogEventKind::Started => (
            "session_started",
            json!({"task_id": task_id, "dialog_id": dialog_id, "status": "success"}),
        ),
        DialogEventKind::DialogStateChanged => (
            "state_changed",
            json!({"dialog_id": dialog_id, "state": field("state"), "task_id": task_id}),
        ),
        DialogEventKind::SpeechContent => (
            "asr_result",
            json!({
                "dialog_id": dialog_id,
                "text": field("text"),
                "finished": field("finished"),
                "task_id": task_id,
            }),
        ),
        DialogEventKind::RespondingContent => (
            "llm_result",
            json!({
                "dialog_id": dialog_id,
                "text": field("text"),
                "spoken": field("spoken"),
                "finished": field("finished"),
                "extra_info": output.get("extra_info").cloned().unwrap_or_else(|| json!({})),
                "task_id": task_id,
            }),
        ),
        DialogEventKind::Error => (
            "error",
            json!({
                "dialog_id": dialog_id,
                "error_code": field("error_code"),
                "error_name": field("error_name"),
                "error_message": field("error_message"),
                "task_id": task_id,
            }),
        ),
        DialogEventKind::HeartBeat => (
            "heartbeat_response",
            json!({"dialog_id": dialog_id, "task_id": task_id}),
        ),
        DialogEventKind::Stopped => (
            "session_stopped",
            json!({"dialog_id": dialog_id, "task_id": task_id, "status": "success"}),
        ),
        DialogEventKind::RespondingStarted
        | DialogEventKind::RespondingEnded
        | DialogEventKind::Other(_) => return None,
    };
    Some(json!({"type": kind, "payload": payload}))
}

/// Serves one MCP client until it disconnects or the upstream goes away.
///
/// The config is validated before any upstream connection is attempted;
/// failures are reported to the client as an error message. When the
/// upstream socket closes the client gets an error message and the session
/// ends.
pub async fn run_mcp(
    config: &McpConfig,
    connector: &dyn Connector,
    mut local_rx: mpsc::Receiver<Frame>,
    local_tx: mpsc::Sender<Frame>,
) {
    if let Err(e) = config.validate() {
        warn!("mcp: rejecting client: {}", e);
        report_error(&local_tx, &e.to_string()).await;
        return;
    }

    let link = match connector.connect().await {
        Ok(link) => link,
        Err(e) => {
            warn!("mcp: upstream connect failed: {}", e);
            let msg = format!("连接阿里云API失败: {e}");
            report_error(&local_tx, &msg).await;
            return;
        }
    };
    let task_id = new_task_id();
    info!("mcp: session {} connected upstream", task_id);

    let up_tx = link.tx;
    let mut downstream = tokio::spawn(pump_downstream(link.rx, task_id.clone(), local_tx.clone()));
    let mut upstream_gone = false;

    loop {
        let frame = tokio::select! {
            frame = local_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = &mut downstream => {
                upstream_gone = true;
                break;
            }
        };
        let out = match frame {
            Frame::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(msg) => match to_upstream(&msg, &task_id, config) {
                    Some(req) => match serde_json::to_string(&req) {
                        Ok(json) => Frame::Text(json),
                        Err(e) => {
                            warn!("mcp: encode failed: {}", e);
                            continue;
                        }
                    },
                    None => {
                        debug!("mcp: ignoring message type {}", msg["type"]);
                        continue;
                    }
                },
                // Not JSON: treat the text as raw bytes.
                Err(_) => Frame::Binary(text.into_bytes()),
            },
            Frame::Binary(data) => Frame::Binary(data),
            Frame::Close => break,
        };
        if up_tx.send(out).await.is_err() {
            warn!("mcp: upstream gone");
            let msg = format!("{UPSTREAM_ERROR_PREFIX}upstream writer closed");
            report_error(&local_tx, &msg).await;
            break;
        }
    }

    if !upstream_gone {
        if up_tx.send(Frame::Close).await.is_err() {
            debug!("mcp: upstream already closed for {}", task_id);
        }
        downstream.abort();
    }
    info!("mcp: session {} closed", task_id);
}

/// Forwards upstream events to the client. Returns once the upstream closes,
/// after telling the client, or once the client is gone.
async fn pump_downstream(
    mut up_rx: mpsc::Receiver<Frame>,
    task_id: String,
    local_tx: mpsc::Sender<Frame>,
) {
    loop {
        let out = match up_rx.recv().await {
            Some(Frame::Text(text)) => match DialogEvent::parse(&text) {
                Ok(event) => match from_upstream(&event, &task_id) {
                    Some(msg) => Frame::json(&msg),
                    None => continue,
                },
                Err(e) => {
                    warn!("mcp: bad upstream json: {}", e);
                    continue;
                }
            },
            Some(Frame::Binary(data)) => Frame::Binary(data),
            Some(Frame::Close) | None => {
                warn!("mcp: upstream closed for session {}", task_id);
                let msg = format!("{UPSTREAM_ERROR_PREFIX}upstream connection closed");
                report_error(&local_tx, &msg).await;
                return;
            }
        };
        if local_tx.send(out).await.is_err() {
            debug!("mcp: client gone, downstream pump exiting");
            return;
        }
    }
}
