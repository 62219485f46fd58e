//! OpenAI-compatible `/chat/completions` client.
//!
//! DeepSeek, Volcengine Ark and DashScope's compatible mode all speak this
//! dialect, so one client covers them; only the base URL, key and model differ.
//!
//! ```rust,ignore
//! use dhagent_llm::{ChatMessage, ChatOptions, OpenAICompatClient, OpenAIConfig};
//!
//! let client = OpenAICompatClient::new(OpenAIConfig {
//!     api_key: "sk-xxx".to_string(),
//!     base_url: "https://api.deepseek.com".to_string(),
//!     model: "deepseek-chat".to_string(),
//! });
//! let reply = client.chat(&[ChatMessage::user("你好")], &ChatOptions::default()).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::ChatBackend;
use crate::error::{Error, Result};
use crate::types::{ChatMessage, ChatOptions, ChatResponse, Usage};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DASHSCOPE_COMPATIBLE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Client for any OpenAI-compatible chat endpoint.
pub struct OpenAICompatClient {
    client: Client,
    config: OpenAIConfig,
    provider: String,
}

impl OpenAICompatClient {
    pub fn new(config: OpenAIConfig) -> Self {
        Self::with_provider("openai", config)
    }

    /// Creates a client that reports `provider` in errors and logs.
    pub fn with_provider(provider: impl Into<String>, mut config: OpenAIConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            provider: provider.into(),
        }
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn build_request(&self, messages: &[ChatMessage], opts: &ChatOptions, stream: bool) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": stream,
        });
        if let Some(t) = opts.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(max) = opts.max_tokens {
            body["max_tokens"] = json!(max);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url);
        debug!("{} POST {}", self.provider, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Api {
                provider: self.provider.clone(),
                status,
                body,
            });
        }
        Ok(response)
    }

    /// Non-streaming completion.
    pub async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<ChatResponse> {
        let body = self.build_request(messages, opts, false);
        let json: Value = self.send(&body).await?.json().await?;
        parse_completion(&json).ok_or_else(|| Error::EmptyResponse(self.provider.clone()))
    }

    /// Streaming completion; yields content deltas until `[DONE]` or a finish reason.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        opts: &ChatOptions,
    ) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
        let body = self.build_request(messages, opts, true);
        let response = self.send(&body).await?;
        let mut bytes = response.bytes_stream();

        Ok(async_stream::try_stream! {
            let mut buffer = String::new();
            'outer: while let Some(chunk) = bytes.next().await {
                buffer.push_str(&String::from_utf8_lossy(&chunk?));
                while let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    match parse_sse_line(&line) {
                        SseLine::Delta(text) => yield text,
                        SseLine::Done => break 'outer,
                        SseLine::Skip => {}
                    }
                }
            }
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAICompatClient {
    fn name(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<ChatResponse> {
        OpenAICompatClient::chat(self, messages, opts).await
    }
}

/// Reads `choices[0].message.content`, `finish_reason` and `usage`.
pub(crate) fn parse_completion(json: &Value) -> Option<ChatResponse> {
    let choice = json["choices"].as_array()?.first()?;
    let text = choice["message"]["content"].as_str()?.to_string();
    let usage = serde_json::from_value::<Usage>(json["usage"].clone()).unwrap_or_default();
    Some(ChatResponse {
        text,
        finish_reason: choice["finish_reason"].as_str().map(str::to_string),
        usage,
    })
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseLine {
    Delta(String),
    Done,
    Skip,
}

/// Classifies one SSE line of a chat completion stream.
pub(crate) fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
    else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    let Ok(json) = serde_json::from_str::<Value>(data) else {
        return SseLine::Skip;
    };
    let Some(choice) = json["choices"].as_array().and_then(|c| c.first()) else {
        return SseLine::Skip;
    };
    if let Some(content) = choice["delta"]["content"].as_str() {
        if !content.is_empty() {
            return SseLine::Delta(content.to_string());
        }
    }
    match choice["finish_reason"].as_str() {
        Some(_) => SseLine::Done,
        None => SseLine::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let client = OpenAICompatClient::new(OpenAIConfig {
            api_key: "k".into(),
            base_url: "https://api.deepseek.com/".into(),
            model: "deepseek-chat".into(),
        });
        assert_eq!(client.config().base_url, "https://api.deepseek.com");

        let body = client.build_request(&[ChatMessage::user("hi")], &ChatOptions::assistant(), false);
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["content"], "hi");
        assert!(body["temperature"].as_f64().unwrap() > 0.69);

        let bare = client.build_request(&[], &ChatOptions::default(), true);
        assert!(bare.get("temperature").is_none());
    }

    #[test]
    fn test_parse_completion() {
        let json = json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "你好！"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        });
        let resp = parse_completion(&json).unwrap();
        assert_eq!(resp.text, "你好！");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.total_tokens, 7);

        assert!(parse_completion(&json!({"choices": []})).is_none());
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"你"},"finish_reason":null}]}"#),
            SseLine::Delta("你".into())
        );
        assert_eq!(
            parse_sse_line(r#"data:{"choices":[{"delta":{},"finish_reason":"stop"}]}"#),
            SseLine::Done
        );
        assert_eq!(parse_sse_line("data: [DONE]\n"), SseLine::Done);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line(r#"data: {"choices":[]}"#), SseLine::Skip);
    }
}
