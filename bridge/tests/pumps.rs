//! Bridge pumps against an in-memory upstream.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use dhagent_bridge::{
    BridgeError, BridgeState, Connector, Frame, McpConfig, Result, UpstreamLink, mcp_router,
    run_gateway, run_mcp,
};
use dhagent_bridge::mcp::UPSTREAM_ERROR_PREFIX;

/// The far side of one fake upstream socket.
struct FakeUpstream {
    /// What the bridge sent upstream.
    sent: mpsc::Receiver<Frame>,
    /// Frames to deliver to the bridge.
    reply: mpsc::Sender<Frame>,
}

struct FakeConnector {
    opened: mpsc::UnboundedSender<FakeUpstream>,
    connects: AtomicUsize,
    fail: bool,
}

impl FakeConnector {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeUpstream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                opened: tx,
                connects: AtomicUsize::new(0),
                fail: false,
            }),
            rx,
        )
    }

    fn failing() -> Arc<Self> {
        let (tx, _) = mpsc::unbounded_channel();
        Arc::new(Self {
            opened: tx,
            connects: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<UpstreamLink> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BridgeError::Config("refused".into()));
        }
        let (to_up_tx, to_up_rx) = mpsc::channel(16);
        let (from_up_tx, from_up_rx) = mpsc::channel(16);
        let _ = self.opened.send(FakeUpstream {
            sent: to_up_rx,
            reply: from_up_tx,
        });
        Ok(UpstreamLink {
            tx: to_up_tx,
            rx: from_up_rx,
        })
    }
}

fn valid_config() -> McpConfig {
    McpConfig {
        api_key: "sk-test".into(),
        workspace_id: "ws".into(),
        app_id: "app".into(),
    }
}

async fn next<T>(rx: &mut mpsc::Receiver<T>) -> T {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

fn json_of(frame: &Frame) -> Value {
    serde_json::from_str(frame.as_text().expect("text frame")).unwrap()
}

#[tokio::test]
async fn mcp_rejects_invalid_config_without_connecting() {
    let (connector, _opened) = FakeConnector::new();
    let (_client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, mut client_rx) = mpsc::channel(8);

    let mut config = valid_config();
    config.api_key = "bad".into();
    run_mcp(&config, connector.as_ref(), local_rx, local_tx).await;

    let err = json_of(&next(&mut client_rx).await);
    assert_eq!(err["type"], "error");
    assert_eq!(
        err["payload"]["message"],
        "API密钥格式无效，请检查ALIYUN_API_KEY是否正确设置"
    );
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mcp_reports_connect_failure() {
    let connector = FakeConnector::failing();
    let (_client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, mut client_rx) = mpsc::channel(8);

    run_mcp(&valid_config(), connector.as_ref(), local_rx, local_tx).await;

    let err = json_of(&next(&mut client_rx).await);
    assert!(
        err["payload"]["message"]
            .as_str()
            .unwrap()
            .starts_with("连接阿里云API失败: ")
    );
}

#[tokio::test]
async fn mcp_round_trip() {
    let (connector, mut opened) = FakeConnector::new();
    let (client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, mut client_rx) = mpsc::channel(8);

    let pump = tokio::spawn(async move {
        run_mcp(&valid_config(), connector.as_ref(), local_rx, local_tx).await;
    });
    let mut up = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();

    client_tx
        .send(Frame::json(&json!({"type": "session_start", "payload": {"voice": "longhua"}})))
        .await
        .unwrap();
    let start = json_of(&next(&mut up.sent).await);
    assert_eq!(start["header"]["action"], "run-task");
    assert_eq!(start["payload"]["parameters"]["downstream"]["voice"], "longhua");
    let task_id = start["header"]["task_id"].as_str().unwrap().to_string();

    // Unknown types are not forwarded; the next frame upstream is the text request.
    client_tx
        .send(Frame::json(&json!({"type": "unknown"})))
        .await
        .unwrap();
    client_tx
        .send(Frame::json(&json!({"type": "text_request", "payload": {"dialog_id": "d", "text": "你好"}})))
        .await
        .unwrap();
    let req = json_of(&next(&mut up.sent).await);
    assert_eq!(req["header"]["task_id"], task_id.as_str());
    assert_eq!(req["payload"]["input"]["text"], "你好");

    client_tx.send(Frame::Text("not json".into())).await.unwrap();
    assert_eq!(next(&mut up.sent).await, Frame::Binary(b"not json".to_vec()));

    client_tx.send(Frame::Binary(vec![1, 2, 3])).await.unwrap();
    assert_eq!(next(&mut up.sent).await, Frame::Binary(vec![1, 2, 3]));

    up.reply
        .send(Frame::json(&json!({"header": {"event": "result-generated"}, "payload": {"output": {"event": "Started", "dialog_id": "d1"}}})))
        .await
        .unwrap();
    let started = json_of(&next(&mut client_rx).await);
    assert_eq!(started["type"], "session_started");
    assert_eq!(started["payload"]["task_id"], task_id.as_str());

    up.reply
        .send(Frame::json(&json!({"payload": {"output": {"event": "RespondingStarted"}}})))
        .await
        .unwrap();
    up.reply.send(Frame::Binary(vec![9, 9])).await.unwrap();
    assert_eq!(next(&mut client_rx).await, Frame::Binary(vec![9, 9]));

    client_tx.send(Frame::Close).await.unwrap();
    assert_eq!(next(&mut up.sent).await, Frame::Close);
    pump.await.unwrap();
}

#[tokio::test]
async fn mcp_reports_upstream_close_and_ends_session() {
    let (connector, mut opened) = FakeConnector::new();
    let (client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, mut client_rx) = mpsc::channel(8);

    let session = tokio::spawn(async move {
        run_mcp(&valid_config(), connector.as_ref(), local_rx, local_tx).await;
    });
    let up = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();
    up.reply.send(Frame::Close).await.unwrap();
    drop(up);

    let err = json_of(&next(&mut client_rx).await);
    assert_eq!(err["type"], "error");
    assert!(
        err["payload"]["message"]
            .as_str()
            .unwrap()
            .starts_with(UPSTREAM_ERROR_PREFIX)
    );

    // The session ends without waiting for the client to speak.
    timeout(Duration::from_secs(2), session).await.unwrap().unwrap();
    drop(client_tx);
}

#[tokio::test]
async fn mcp_reports_dropped_upstream() {
    let (connector, mut opened) = FakeConnector::new();
    let (_client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, mut client_rx) = mpsc::channel(8);

    let session = tokio::spawn(async move {
        run_mcp(&valid_config(), connector.as_ref(), local_rx, local_tx).await;
    });
    let up = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();
    drop(up.reply);

    let err = json_of(&next(&mut client_rx).await);
    assert_eq!(err["type"], "error");
    timeout(Duration::from_secs(2), session).await.unwrap().unwrap();
}

#[tokio::test]
async fn gateway_reconnects_after_upstream_dies() {
    let (connector, mut opened) = FakeConnector::new();
    let (client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, _client_rx) = mpsc::channel(8);
    let pump = tokio::spawn(run_gateway(connector.clone(), local_rx, local_tx));

    let start = json!({
        "header": {"action": "run-task", "task_id": "A"},
        "payload": {"input": {"directive": "Start"}}
    });
    client_tx.send(Frame::json(&start)).await.unwrap();
    let mut first = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();
    let first_start = json_of(&next(&mut first.sent).await);

    // The upstream reader ends while its writer side still accepts frames.
    first.reply.send(Frame::Close).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    client_tx
        .send(Frame::json(&json!({
            "header": {"action": "continue-task", "task_id": "A"},
            "payload": {"input": {"directive": "HeartBeat"}}
        })))
        .await
        .unwrap();
    let mut second = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();
    let hb = json_of(&next(&mut second.sent).await);
    assert_eq!(hb["payload"]["input"]["directive"], "HeartBeat");
    assert_eq!(hb["header"]["task_id"], first_start["header"]["task_id"]);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);

    drop(client_tx);
    pump.await.unwrap();
    assert_eq!(next(&mut second.sent).await, Frame::Close);
}

#[tokio::test]
async fn gateway_forgets_task_when_connect_fails() {
    let connector = FakeConnector::failing();
    let (client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, _client_rx) = mpsc::channel(8);
    let pump = tokio::spawn(run_gateway(connector.clone(), local_rx, local_tx));

    for _ in 0..2 {
        client_tx
            .send(Frame::json(&json!({"header": {"action": "run-task", "task_id": "A"}})))
            .await
            .unwrap();
    }
    drop(client_tx);
    pump.await.unwrap();
    // Every message retries the connect; nothing is left half-open.
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn gateway_opens_one_upstream_per_task() {
    let (connector, mut opened) = FakeConnector::new();
    let (client_tx, local_rx) = mpsc::channel(8);
    let (local_tx, mut client_rx) = mpsc::channel(8);
    let pump = tokio::spawn(run_gateway(connector.clone(), local_rx, local_tx));

    client_tx
        .send(Frame::json(&json!({"header": {"action": "run-task"}})))
        .await
        .unwrap();
    client_tx
        .send(Frame::json(&json!({
            "header": {"action": "run-task", "task_id": "A"},
            "payload": {"input": {"directive": "Start"}}
        })))
        .await
        .unwrap();
    let mut up_a = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();
    let start = json_of(&next(&mut up_a.sent).await);
    let up_task = start["header"]["task_id"].as_str().unwrap().to_string();
    assert_ne!(up_task, "A");
    assert_eq!(start["payload"]["parameters"]["upstream"]["type"], "AudioOnly");

    client_tx
        .send(Frame::json(&json!({"header": {"action": "run-task", "task_id": "B"}})))
        .await
        .unwrap();
    let mut up_b = timeout(Duration::from_secs(2), opened.recv()).await.unwrap().unwrap();
    let b_msg = json_of(&next(&mut up_b.sent).await);
    assert_ne!(b_msg["header"]["task_id"], up_task.as_str());
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);

    up_a.reply
        .send(Frame::json(&json!({
            "header": {"event": "result-generated", "task_id": up_task},
            "payload": {"output": {"event": "Started", "dialog_id": "UP"}}
        })))
        .await
        .unwrap();
    let started = json_of(&next(&mut client_rx).await);
    assert_eq!(started["header"]["task_id"], "A");
    let local_dialog = started["payload"]["output"]["dialog_id"].as_str().unwrap().to_string();
    assert_ne!(local_dialog, "UP");

    client_tx
        .send(Frame::json(&json!({
            "header": {"action": "continue-task", "task_id": "A"},
            "payload": {"input": {"directive": "HeartBeat", "dialog_id": local_dialog}}
        })))
        .await
        .unwrap();
    let hb = json_of(&next(&mut up_a.sent).await);
    assert_eq!(hb["payload"]["input"]["dialog_id"], "UP");

    drop(client_tx);
    pump.await.unwrap();
    assert_eq!(next(&mut up_a.sent).await, Frame::Close);
    assert_eq!(next(&mut up_b.sent).await, Frame::Close);
}

#[tokio::test]
async fn websocket_mcp_endpoint_reports_config_error() {
    let (connector, _opened) = FakeConnector::new();
    let state = BridgeState {
        mcp: McpConfig::default(),
        mcp_connector: connector.clone(),
        gateway_connector: connector,
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, mcp_router(state)).await.unwrap();
    });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/mcp/multimodal"))
        .await
        .unwrap();
    let msg = timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = msg else {
        panic!("expected text, got {msg:?}");
    };
    let v: Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(v["type"], "error");
    let _ = ws.close(None).await;
}
