//! The emotion skill over HTTP.
//!
//! - `GET /manifest`: skill manifest
//! - `POST /execute`: `{"image_base64": ...}` -> skill result
//! - `GET /health`

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dhagent_emotion::EmotionSkill;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::server::health;

pub const EMPTY_BODY_ERROR: &str = "请求体不能为空";

pub fn router(skill: EmotionSkill) -> Router {
    Router::new()
        .route("/manifest", get(manifest))
        .route("/execute", post(execute))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(skill)
}

async fn manifest() -> Json<Value> {
    Json(EmotionSkill::manifest())
}

async fn execute(State(skill): State<EmotionSkill>, body: Bytes) -> Response {
    let Some(params) = json_body(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": EMPTY_BODY_ERROR, "result": null})),
        )
            .into_response();
    };

    // Inference is CPU bound.
    match tokio::task::spawn_blocking(move || skill.call(&params)).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            error!("emotion skill task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": format!("执行情绪分析技能时出错: {}", e),
                    "result": null
                })),
            )
                .into_response()
        }
    }
}

/// Parses a JSON body, treating unparsable input, `null` and empty
/// objects, arrays or strings as missing.
pub(crate) fn json_body(body: &[u8]) -> Option<Value> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let empty = match &value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    (!empty).then_some(value)
}
