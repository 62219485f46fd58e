//! OpenAI wire shapes and conversions from loosely typed request messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dhagent_dashscope::{ContentItem, Error, Message, MultiModalMessage};
use serde_json::{Value, json};

pub const COMPLETION_ID: &str = "chatcmpl-123";
pub const COMPLETION_CREATED: u64 = 1677652288;
pub const END_CHUNK_ID: &str = "chatcmpl-end";
const MODEL_CREATED: u64 = 1677610602;

pub fn completion(model: &str, content: &str) -> Value {
    json!({
        "id": COMPLETION_ID,
        "object": "chat.completion",
        "created": COMPLETION_CREATED,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
    })
}

/// One streamed character. `index` doubles as the chunk id suffix and `created`.
pub fn chunk(index: usize, model: &str, delta: &str) -> Value {
    json!({
        "id": format!("chatcmpl-{}", index),
        "object": "chat.completion.chunk",
        "created": index,
        "model": model,
        "choices": [{"index": 0, "delta": {"content": delta}, "finish_reason": null}]
    })
}

pub fn end_chunk(model: &str, content_chars: usize) -> Value {
    json!({
        "id": END_CHUNK_ID,
        "object": "chat.completion.chunk",
        "created": content_chars,
        "model": model,
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    })
}

pub fn models(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "object": "model", "created": MODEL_CREATED, "owned_by": "system"}))
        .collect();
    json!({"object": "list", "data": data})
}

/// `{"error": {...}}` for an upstream failure. API errors keep their code.
pub fn upstream_error(err: &Error) -> Value {
    match err {
        Error::Api { code, message, .. } => json!({
            "error": {
                "message": format!("API调用出错: {}, {}", code, message),
                "type": "api_error",
                "code": code
            }
        }),
        other => json!({"error": {"message": other.to_string(), "type": "api_error"}}),
    }
}

pub fn upstream_error_response(err: &Error) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(upstream_error(err))).into_response()
}

pub fn invalid_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": {"message": message, "type": "invalid_request_error"}})),
    )
        .into_response()
}

/// Text of a message `content`: a string, or the text items of a list in
/// either the OpenAI (`{"type":"text","text":..}`) or DashScope (`{"text":..}`) form.
pub fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().filter_map(|i| i["text"].as_str()).collect(),
        _ => String::new(),
    }
}

fn role(msg: &Value) -> String {
    msg["role"].as_str().unwrap_or("user").to_string()
}

pub fn text_messages(messages: &[Value]) -> Vec<Message> {
    messages
        .iter()
        .map(|m| Message::new(role(m), content_text(&m["content"])))
        .collect()
}

fn content_item(item: &Value) -> Option<ContentItem> {
    if let Some(text) = item["text"].as_str() {
        return Some(ContentItem::Text(text.to_string()));
    }
    if let Some(image) = item["image"].as_str() {
        return Some(ContentItem::Image(image.to_string()));
    }
    if let Some(url) = item["image_url"]["url"].as_str().or(item["image_url"].as_str()) {
        return Some(ContentItem::Image(url.to_string()));
    }
    item["audio"].as_str().map(|a| ContentItem::Audio(a.to_string()))
}

pub fn multimodal_messages(messages: &[Value]) -> Vec<MultiModalMessage> {
    messages
        .iter()
        .map(|m| {
            let content = match &m["content"] {
                Value::String(s) => vec![ContentItem::Text(s.clone())],
                Value::Array(items) => items.iter().filter_map(content_item).collect(),
                _ => Vec::new(),
            };
            MultiModalMessage { role: role(m), content }
        })
        .collect()
}
