//! Qwen chat backed by DashScope `Generation`.

use async_trait::async_trait;
use dhagent_dashscope::{Client, GenerationRequest, Message};

use crate::backend::ChatBackend;
use crate::error::{Error, Result};
use crate::types::{ChatMessage, ChatOptions, ChatResponse, Usage};

pub struct QwenBackend {
    client: Client,
    model: String,
}

impl QwenBackend {
    pub fn new(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub(crate) fn build_request(&self, messages: &[ChatMessage], opts: &ChatOptions) -> GenerationRequest {
        // Generation takes text content only; image parts are dropped.
        let messages = messages
            .iter()
            .map(|m| Message::new(m.role.clone(), m.text()))
            .collect();
        let mut req = GenerationRequest::new(&self.model, messages);
        req.parameters.temperature = opts.temperature;
        req.parameters.max_tokens = opts.max_tokens;
        req
    }
}

#[async_trait]
impl ChatBackend for QwenBackend {
    fn name(&self) -> &str {
        "qwen"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<ChatResponse> {
        let resp = self
            .client
            .generation()
            .call(&self.build_request(messages, opts))
            .await?;

        let text = resp
            .text()
            .ok_or_else(|| Error::EmptyResponse("qwen".to_string()))?
            .to_string();
        let finish_reason = resp
            .output
            .choices
            .first()
            .and_then(|c| c.finish_reason.clone())
            .or(resp.output.finish_reason.clone());
        let usage = resp
            .usage
            .map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(ChatResponse {
            text,
            finish_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_flattens_parts() {
        let backend = QwenBackend::new(Client::new("sk-test").unwrap(), "qwen-plus");
        let req = backend.build_request(
            &[
                ChatMessage::system("sys"),
                ChatMessage::user_with_image("这是什么", "data:image/png;base64,AA"),
            ],
            &ChatOptions::assistant(),
        );
        assert_eq!(req.model, "qwen-plus");
        assert_eq!(req.input.messages[1], Message::user("这是什么"));
        assert_eq!(req.parameters.max_tokens, Some(1024));
    }
}
