//! Vision-language conversation
//! (`POST /api/v1/services/aigc/multimodal-generation/generation`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    generation::GenerationParameters,
    http::HttpClient,
    types::Usage,
};

pub(crate) const MULTIMODAL_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";

pub struct MultiModalService {
    http: Arc<HttpClient>,
}

impl MultiModalService {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn call(&self, req: &MultiModalRequest) -> Result<MultiModalResponse> {
        if req.model.is_empty() {
            return Err(Error::Config("model must be non-empty".to_string()));
        }
        self.http.post(MULTIMODAL_PATH, req).await
    }

    /// Calls the model and returns the first text item of the reply.
    pub async fn text(&self, req: &MultiModalRequest) -> Result<String> {
        let resp = self.call(req).await?;
        resp.text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| Error::UnexpectedResponse("multimodal reply has no text item".to_string()))
    }
}

/// One item of a multimodal message. Serialized as `{"text": ..}`, `{"image": ..}`
/// or `{"audio": ..}`; image and audio accept URLs or `data:` URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentItem {
    Text(String),
    Image(String),
    Audio(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiModalMessage {
    pub role: String,
    pub content: Vec<ContentItem>,
}

impl MultiModalMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: vec![ContentItem::Text(text.into())],
        }
    }

    pub fn user(content: Vec<ContentItem>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

    /// A user turn holding an image followed by a question about it.
    pub fn user_image(image_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self::user(vec![
            ContentItem::Image(image_url.into()),
            ContentItem::Text(text.into()),
        ])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiModalRequest {
    pub model: String,
    pub input: MultiModalInput,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiModalInput {
    pub messages: Vec<MultiModalMessage>,
}

impl MultiModalRequest {
    pub fn new(model: impl Into<String>, messages: Vec<MultiModalMessage>) -> Self {
        Self {
            model: model.into(),
            input: MultiModalInput { messages },
            parameters: GenerationParameters::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiModalResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub output: MultiModalOutput,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiModalOutput {
    #[serde(default)]
    pub choices: Vec<MultiModalChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiModalChoice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: RawMessage,
}

/// Reply message; `content` is either a string or a list of items.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Value,
}

impl MultiModalResponse {
    /// First `text` item of the first choice.
    pub fn text(&self) -> Option<&str> {
        let content = &self.output.choices.first()?.message.content;
        match content {
            Value::String(s) => Some(s.as_str()),
            Value::Array(items) => items
                .iter()
                .find_map(|item| item.get("text").and_then(Value::as_str)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_item_shape() {
        let msg = MultiModalMessage::user_image("data:image/jpeg;base64,AAAA", "这是什么");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({"role": "user", "content": [{"image": "data:image/jpeg;base64,AAAA"}, {"text": "这是什么"}]})
        );
    }

    #[test]
    fn test_response_text_from_items() {
        let resp: MultiModalResponse = serde_json::from_value(json!({
            "output": {"choices": [{"finish_reason": "stop", "message": {
                "role": "assistant",
                "content": [{"audio": {"data": ""}}, {"text": "一只猫"}]
            }}]}
        }))
        .unwrap();
        assert_eq!(resp.text(), Some("一只猫"));
    }

    #[test]
    fn test_response_text_from_string() {
        let resp: MultiModalResponse = serde_json::from_value(json!({
            "output": {"choices": [{"message": {"role": "assistant", "content": "ok"}}]}
        }))
        .unwrap();
        assert_eq!(resp.text(), Some("ok"));
        assert_eq!(MultiModalResponse::default().text(), None);
    }
}
