//! Volcengine Ark Responses API (`POST /api/v3/responses`).

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::openai::ARK_BASE_URL;

pub const ARK_DEFAULT_VISION_MODEL: &str = "doubao-seed-1-8-251228";

/// Image + text question answering through the Responses API.
pub struct ArkResponsesClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ArkResponsesClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: ARK_BASE_URL.to_string(),
            model: ARK_DEFAULT_VISION_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub(crate) fn build_request(&self, image_url: &str, text: &str) -> Value {
        json!({
            "model": self.model,
            "input": [{
                "role": "user",
                "content": [
                    {"type": "input_image", "image_url": image_url},
                    {"type": "input_text", "text": text},
                ],
            }],
        })
    }

    /// Asks `text` about the image and returns the full response JSON.
    pub async fn respond(&self, image_url: &str, text: &str) -> Result<Value> {
        let url = format!("{}/responses", self.base_url);
        debug!("ark POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(image_url, text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                provider: "ark".to_string(),
                status,
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Asks `text` about the image and returns the answer text.
    pub async fn describe(&self, image_url: &str, text: &str) -> Result<String> {
        let json = self.respond(image_url, text).await?;
        extract_output_text(&json).ok_or_else(|| Error::EmptyResponse("ark".to_string()))
    }
}

/// Joins every `output_text` part of the `message` items in `output`.
/// Reasoning items are skipped.
pub fn extract_output_text(json: &Value) -> Option<String> {
    let text: String = json["output"]
        .as_array()?
        .iter()
        .filter(|item| item["type"] == "message")
        .filter_map(|item| item["content"].as_array())
        .flatten()
        .filter(|part| part["type"] == "output_text")
        .filter_map(|part| part["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}
