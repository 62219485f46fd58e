//! Shared serving helpers.

use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;

pub const EMOTION_SERVICE_ADDR: &str = "0.0.0.0:8089";
pub const INTENT_ADAPTER_ADDR: &str = "0.0.0.0:8090";
pub const CHAT_API_ADDR: &str = "0.0.0.0:8080";

/// Expands `:8080` to `0.0.0.0:8080`; other addresses pass through.
pub fn listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

/// Binds `addr` and serves `app` until the process exits.
pub async fn serve(addr: &str, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr(addr)).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}
