//! Axum WebSocket endpoints for both bridges.
//!
//! - `GET /mcp/multimodal`: MCP bridge (default port 8766)
//! - `GET /`: envelope gateway (default port 8765)
//! - `GET /health`

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::McpConfig;
use crate::frame::Frame;
use crate::gateway::run_gateway;
use crate::mcp::run_mcp;
use crate::upstream::Connector;

const FRAME_BUFFER: usize = 100;

pub const DEFAULT_MCP_ADDR: &str = "0.0.0.0:8766";
pub const DEFAULT_GATEWAY_ADDR: &str = "0.0.0.0:8765";

#[derive(Clone)]
pub struct BridgeState {
    pub mcp: McpConfig,
    pub mcp_connector: Arc<dyn Connector>,
    pub gateway_connector: Arc<dyn Connector>,
}

pub fn mcp_router(state: BridgeState) -> Router {
    Router::new()
        .route("/mcp/multimodal", get(mcp_handler))
        .route("/health", get(health))
        .with_state(state)
}

pub fn gateway_router(state: BridgeState) -> Router {
    Router::new()
        .route("/", get(gateway_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

async fn mcp_handler(ws: WebSocketUpgrade, State(state): State<BridgeState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (local_rx, local_tx) = attach(socket);
        run_mcp(&state.mcp, state.mcp_connector.as_ref(), local_rx, local_tx).await;
    })
}

async fn gateway_handler(
    ws: WebSocketUpgrade,
    State(state): State<BridgeState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (local_rx, local_tx) = attach(socket);
        run_gateway(state.gateway_connector.clone(), local_rx, local_tx).await;
    })
}

/// Bridges an axum socket to a pair of frame channels.
fn attach(socket: WebSocket) -> (mpsc::Receiver<Frame>, mpsc::Sender<Frame>) {
    let (mut sink, mut stream) = socket.split();
    let (in_tx, in_rx) = mpsc::channel::<Frame>(FRAME_BUFFER);
    let (out_tx, mut out_rx) = mpsc::channel::<Frame>(FRAME_BUFFER);

    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::from(frame)).await.is_err() {
                break;
            }
        }
        if let Err(e) = sink.close().await {
            debug!("client socket close failed: {}", e);
        }
    });

    tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            let Some(frame) = Frame::from_ws(msg) else {
                continue;
            };
            let closing = frame == Frame::Close;
            if in_tx.send(frame).await.is_err() || closing {
                break;
            }
        }
        debug!("client socket closed");
    });

    (in_rx, out_tx)
}
