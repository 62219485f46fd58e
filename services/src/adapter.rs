//! Intent adapter between the multimodal interaction kit and the emotion
//! service.
//!
//! - `POST /process-intent`: dispatches `message.metadata.intentInfos`
//! - `GET /agentCard`, `GET /.well-known/agent.json`: built-in descriptors
//! - `GET /agentcard`: descriptor read from disk
//! - `GET /health`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::card::{agent_card, agent_document, load_card};
use crate::emotion::{EMPTY_BODY_ERROR, json_body};
use crate::server::health;

pub const EMOTION_INTENT: &str = "emotion-analysis";
pub const DEFAULT_EMOTION_SERVICE_URL: &str = "http://localhost:8089";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8090";
pub const DEFAULT_AGENTCARD_FILE: &str = "emotion_analysis_agentcard.json";

const EXECUTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Base URL of the emotion service (`/execute` is appended).
    pub emotion_service_url: String,
    /// URL advertised in the agent descriptors.
    pub public_url: String,
    pub agentcard_path: PathBuf,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            emotion_service_url: DEFAULT_EMOTION_SERVICE_URL.to_string(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            agentcard_path: PathBuf::from(DEFAULT_AGENTCARD_FILE),
        }
    }
}

#[derive(Clone)]
struct AdapterState {
    config: Arc<AdapterConfig>,
    http: reqwest::Client,
}

pub fn router(config: AdapterConfig) -> Router {
    let state = AdapterState {
        config: Arc::new(config),
        http: reqwest::Client::new(),
    };
    Router::new()
        .route("/process-intent", post(process_intent))
        .route("/agentCard", get(get_agent_card))
        .route("/.well-known/agent.json", get(get_agent_document))
        .route("/agentcard", get(get_agentcard_file))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn process_intent(State(state): State<AdapterState>, body: Bytes) -> Response {
    let Some(data) = json_body(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": EMPTY_BODY_ERROR, "result": null})),
        )
            .into_response();
    };

    let message = &data["message"];
    let intents = message["metadata"]["intentInfos"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    if intents.is_empty() {
        return Json(json!({
            "success": false,
            "error": "未检测到意图信息",
            "result": "抱歉，我没有理解您的意图。"
        }))
        .into_response();
    }

    let mut responses = Vec::with_capacity(intents.len());
    for info in &intents {
        let intent = info["intent"].as_str().unwrap_or_default();
        let response = if intent == EMOTION_INTENT {
            let slots = info["slots"].as_array().map(Vec::as_slice).unwrap_or_default();
            match extract_image(message, slots) {
                Some(image) => call_emotion_service(&state, &image).await,
                None => json!({
                    "success": false,
                    "error": "未提供图片数据",
                    "result": "请提供一张图片以进行情绪分析。"
                }),
            }
        } else {
            info!("unsupported intent: {}", intent);
            json!({
                "success": false,
                "error": format!("不支持的意图: {}", intent),
                "result": format!("抱歉，我不支持 '{}' 这个功能。", intent)
            })
        };
        responses.push(json!({"intent": info["intent"], "response": response}));
    }

    Json(json!({"success": true, "responses": responses})).into_response()
}

/// Finds the image for an emotion intent.
///
/// The `image_base64` slot wins. Otherwise the message parts are scanned in
/// order: an `image` part's `data`, or a text part holding a `data:image`
/// URL. A later part overrides an earlier one, and a `data:image` text with
/// no comma clears what was found.
pub fn extract_image(message: &Value, slots: &[Value]) -> Option<String> {
    let from_slot = slots
        .iter()
        .find(|s| s["name"] == "image_base64")
        .and_then(|s| s["value"].as_str())
        .filter(|v| !v.is_empty());
    if let Some(image) = from_slot {
        return Some(image.to_string());
    }

    let mut found: Option<String> = None;
    for part in message["parts"].as_array().into_iter().flatten() {
        match part["kind"].as_str() {
            Some("image") => {
                if let Some(data) = part.get("data") {
                    found = data.as_str().map(str::to_string);
                }
            }
            Some("text") => {
                let text = part["text"].as_str().unwrap_or_default();
                if text.starts_with("data:image") {
                    found = text.split(',').nth(1).map(str::to_string);
                }
            }
            _ => {}
        }
    }
    found.filter(|v| !v.is_empty())
}

async fn call_emotion_service(state: &AdapterState, image_base64: &str) -> Value {
    let url = format!("{}/execute", state.config.emotion_service_url.trim_end_matches('/'));
    let resp = state
        .http
        .post(&url)
        .json(&json!({"image_base64": image_base64}))
        .timeout(EXECUTE_TIMEOUT)
        .send()
        .await;

    let resp = match resp {
        Ok(r) => r,
        Err(e) => {
            error!("emotion service call failed: {}", e);
            return json!({
                "success": false,
                "error": format!("调用服务时发生异常: {}", e),
                "result": null
            });
        }
    };

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        error!("emotion service returned {}: {}", status.as_u16(), body);
        return json!({
            "success": false,
            "error": format!("服务调用失败: {}", status.as_u16()),
            "result": null
        });
    }

    match resp.json::<Value>().await {
        Ok(v) => v,
        Err(e) => {
            error!("emotion service returned invalid JSON: {}", e);
            json!({
                "success": false,
                "error": format!("调用服务时发生异常: {}", e),
                "result": null
            })
        }
    }
}

async fn get_agent_card(State(state): State<AdapterState>) -> Json<Value> {
    Json(agent_card(&state.config.public_url))
}

async fn get_agent_document(State(state): State<AdapterState>) -> Json<Value> {
    Json(agent_document(&state.config.public_url))
}

async fn get_agentcard_file(State(state): State<AdapterState>) -> Response {
    match load_card(&state.config.agentcard_path) {
        Ok(card) => Json(card).into_response(),
        Err(message) => {
            error!("{}", message);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": message}))).into_response()
        }
    }
}
