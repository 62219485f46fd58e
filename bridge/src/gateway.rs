//! The envelope gateway.
//!
//! Local clients speak the DashScope envelope themselves but with their own
//! task and dialog ids. Each local task id gets a dedicated upstream socket
//! and a fresh upstream task id; dialog ids are rewritten in both directions
//! once the upstream `Started` event arrives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dhagent_dashscope::dialog::{DIRECTIVE_START, STREAMING_DUPLEX, new_task_id};
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::frame::Frame;
use crate::upstream::Connector;

/// Id pairs for one local task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskMapping {
    pub local_task_id: String,
    pub upstream_task_id: String,
    pub upstream_dialog_id: Option<String>,
    pub local_dialog_id: Option<String>,
}

/// All task mappings of one local connection.
#[derive(Debug, Default)]
pub struct TaskMap {
    tasks: HashMap<String, TaskMapping>,
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(m) => m,
        _ => unreachable!("slot was just set to an object"),
    }
}

impl TaskMap {
    pub fn get(&self, local_task_id: &str) -> Option<&TaskMapping> {
        self.tasks.get(local_task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn remove(&mut self, local_task_id: &str) -> Option<TaskMapping> {
        self.tasks.remove(local_task_id)
    }

    fn ensure(&mut self, local_task_id: &str) -> &mut TaskMapping {
        self.tasks
            .entry(local_task_id.to_string())
            .or_insert_with(|| TaskMapping {
                local_task_id: local_task_id.to_string(),
                upstream_task_id: new_task_id(),
                upstream_dialog_id: None,
                local_dialog_id: None,
            })
    }

    /// Rewrites a local envelope for upstream. Returns the local task id and
    /// the upstream message, or `None` when the header has no `task_id`.
    pub fn outbound(&mut self, local: &Value) -> Option<(String, Value)> {
        let header = local.get("header")?;
        let local_task_id = header.get("task_id")?.as_str()?.to_string();
        let mapping = self.ensure(&local_task_id);

        let mut payload = local.get("payload").cloned().unwrap_or_else(|| json!({}));

        // Only an existing `input` object is rewritten; anything else passes through.
        let mut is_start = false;
        if let Some(input) = payload.get_mut("input").and_then(Value::as_object_mut) {
            is_start = input.get("directive").and_then(Value::as_str) == Some(DIRECTIVE_START);
            let remapped = match (
                input.get("dialog_id").and_then(Value::as_str),
                &mapping.local_dialog_id,
                &mapping.upstream_dialog_id,
            ) {
                (Some(id), Some(local_dialog), Some(upstream_dialog)) if id == local_dialog => {
                    Some(upstream_dialog.clone())
                }
                _ => None,
            };
            if let Some(upstream_dialog) = remapped {
                input.insert("dialog_id".to_string(), json!(upstream_dialog));
            }
        }

        if is_start {
            if let Some(payload) = payload.as_object_mut() {
                let params = object_entry(payload, "parameters");
                let upstream = object_entry(params, "upstream");
                upstream.entry("type").or_insert_with(|| json!("AudioOnly"));
                upstream.entry("mode").or_insert_with(|| json!(STREAMING_DUPLEX));
                upstream.entry("sample_rate").or_insert_with(|| json!(16000));
            }
        }

        let message = json!({
            "header": {
                "action": header.get("action").cloned().unwrap_or(Value::Null),
                "task_id": mapping.upstream_task_id,
                "streaming": header
                    .get("streaming")
                    .cloned()
                    .unwrap_or_else(|| json!(STREAMING_DUPLEX)),
            },
            "payload": payload,
        });
        Some((local_task_id, message))
    }

    /// Rewrites an upstream event for the local client of `local_task_id`.
    pub fn inbound(&mut self, local_task_id: &str, upstream: &Value) -> Value {
        let header = upstream.get("header").cloned().unwrap_or_else(|| json!({}));
        let upstream_task_id = header.get("task_id").and_then(Value::as_str).unwrap_or_default();

        let local_task_id = self
            .tasks
            .values()
            .find(|m| m.upstream_task_id == upstream_task_id)
            .map(|m| m.local_task_id.clone())
            .unwrap_or_else(|| local_task_id.to_string());

        let mut payload = upstream.get("payload").cloned().unwrap_or_else(|| json!({}));
        if let Some(output) = payload.get_mut("output").and_then(Value::as_object_mut) {
            let event = output.get("event").and_then(Value::as_str).unwrap_or_default();
            let dialog_id = output.get("dialog_id").and_then(Value::as_str).map(str::to_string);
            if let Some(dialog_id) = dialog_id {
                let mapping = self.ensure(&local_task_id);
                if event == "Started" {
                    let local_dialog = uuid::Uuid::new_v4().to_string();
                    info!(
                        "gateway: dialog started, local {} upstream {}",
                        local_dialog, dialog_id
                    );
                    mapping.upstream_dialog_id = Some(dialog_id);
                    mapping.local_dialog_id = Some(local_dialog.clone());
                    output.insert("dialog_id".to_string(), json!(local_dialog));
                } else if mapping.upstream_dialog_id.as_deref() == Some(dialog_id.as_str()) {
                    if let Some(local_dialog) = &mapping.local_dialog_id {
                        output.insert("dialog_id".to_string(), json!(local_dialog));
                    }
                }
            }
        }

        json!({
            "header": {
                "event": header.get("event").cloned().unwrap_or_else(|| json!("")),
                "task_id": local_task_id,
            },
            "payload": payload,
        })
    }
}

/// One upstream socket and the pump feeding its events back to the client.
struct Upstream {
    tx: mpsc::Sender<Frame>,
    pump: JoinHandle<()>,
}

impl Upstream {
    fn is_alive(&self) -> bool {
        !self.tx.is_closed() && !self.pump.is_finished()
    }
}

/// Per-connection gateway state.
struct GatewaySession {
    connector: Arc<dyn Connector>,
    tasks: Arc<Mutex<TaskMap>>,
    upstreams: HashMap<String, Upstream>,
    local_tx: mpsc::Sender<Frame>,
}

impl GatewaySession {
    fn new(connector: Arc<dyn Connector>, local_tx: mpsc::Sender<Frame>) -> Self {
        Self {
            connector,
            tasks: Arc::new(Mutex::new(TaskMap::default())),
            upstreams: HashMap::new(),
            local_tx,
        }
    }

    /// Opens a fresh upstream for `local_task_id`, replacing any dead one.
    /// A failed connect forgets the task.
    async fn connect(&mut self, local_task_id: &str) -> Option<mpsc::Sender<Frame>> {
        if let Some(old) = self.upstreams.remove(local_task_id) {
            old.pump.abort();
        }
        match self.connector.connect().await {
            Ok(link) => {
                info!("gateway: upstream opened for task {}", local_task_id);
                let pump = spawn_downstream(
                    local_task_id.to_string(),
                    link.rx,
                    self.tasks.clone(),
                    self.local_tx.clone(),
                );
                self.upstreams.insert(
                    local_task_id.to_string(),
                    Upstream {
                        tx: link.tx.clone(),
                        pump,
                    },
                );
                Some(link.tx)
            }
            Err(e) => {
                warn!("gateway: upstream connect failed for {}: {}", local_task_id, e);
                lock(&self.tasks).remove(local_task_id);
                None
            }
        }
    }

    /// Sends `frame` to the task's upstream, connecting as needed. If the
    /// send fails the upstream is reopened once and the send retried.
    async fn forward(&mut self, local_task_id: &str, frame: Frame) {
        let alive = self
            .upstreams
            .get(local_task_id)
            .filter(|up| up.is_alive())
            .map(|up| up.tx.clone());
        let up = match alive {
            Some(tx) => Some(tx),
            None => self.connect(local_task_id).await,
        };
        let Some(up) = up else {
            return;
        };
        let Err(mpsc::error::SendError(frame)) = up.send(frame).await else {
            return;
        };

        warn!("gateway: upstream for {} closed, reconnecting", local_task_id);
        let Some(up) = self.connect(local_task_id).await else {
            return;
        };
        if up.send(frame).await.is_err() {
            warn!("gateway: dropping message for {} after reconnect", local_task_id);
        }
    }

    /// Sends audio to an existing upstream; audio never opens one.
    async fn forward_audio(&mut self, local_task_id: &str, data: Vec<u8>) {
        match self.upstreams.get(local_task_id) {
            Some(up) => {
                if up.tx.send(Frame::Binary(data)).await.is_err() {
                    debug!("gateway: audio for {} dropped, upstream closed", local_task_id);
                }
            }
            None => debug!("gateway: no upstream for audio of task {}", local_task_id),
        }
    }

    async fn close(mut self) {
        for (task_id, up) in self.upstreams.drain() {
            if up.tx.send(Frame::Close).await.is_err() {
                debug!("gateway: upstream for {} already closed", task_id);
            }
            up.pump.abort();
            lock(&self.tasks).remove(&task_id);
            debug!("gateway: cleaned up task {}", task_id);
        }
    }
}

/// Serves one local gateway connection until it disconnects.
pub async fn run_gateway(
    connector: Arc<dyn Connector>,
    mut local_rx: mpsc::Receiver<Frame>,
    local_tx: mpsc::Sender<Frame>,
) {
    let mut session = GatewaySession::new(connector, local_tx);
    let mut last_task: Option<String> = None;

    while let Some(frame) = local_rx.recv().await {
        let text = match frame {
            Frame::Text(text) => text,
            Frame::Binary(data) => {
                // Audio follows the most recent task.
                match &last_task {
                    Some(task) => session.forward_audio(task, data).await,
                    None => debug!("gateway: dropping audio before any task"),
                }
                continue;
            }
            Frame::Close => break,
        };

        let local: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warn!("gateway: bad client json: {}", e);
                continue;
            }
        };
        let Some((local_task_id, message)) = lock(&session.tasks).outbound(&local) else {
            warn!("gateway: message without task_id");
            continue;
        };

        session.forward(&local_task_id, Frame::json(&message)).await;
        last_task = Some(local_task_id);
    }

    session.close().await;
}

fn spawn_downstream(
    local_task_id: String,
    mut up_rx: mpsc::Receiver<Frame>,
    tasks: Arc<Mutex<TaskMap>>,
    local_tx: mpsc::Sender<Frame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = up_rx.recv().await {
            let out = match frame {
                Frame::Text(text) => match serde_json::from_str::<Value>(&text) {
                    Ok(event) => Frame::json(&lock(&tasks).inbound(&local_task_id, &event)),
                    Err(e) => {
                        warn!("gateway: bad upstream json: {}", e);
                        continue;
                    }
                },
                Frame::Binary(data) => Frame::Binary(data),
                Frame::Close => break,
            };
            if local_tx.send(out).await.is_err() {
                break;
            }
        }
        info!("gateway: upstream closed for task {}", local_task_id);
    })
}

fn lock(tasks: &Mutex<TaskMap>) -> std::sync::MutexGuard<'_, TaskMap> {
    tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
