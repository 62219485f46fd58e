//! Voice-assistant reply generation with a fixed fallback.

use std::sync::Arc;

use tracing::{error, info};

use crate::backend::ChatBackend;
use crate::types::{ChatMessage, ChatOptions};

/// System prompt for the voice assistant.
pub const ASSISTANT_SYSTEM_PROMPT: &str = "你是一个智能语音助手，使用自然、简洁的语言进行对话。";

/// Reply used when the backend call fails.
pub const NETWORK_FAILURE_REPLY: &str = "网络连接出现问题，请稍后再试。";

/// Reply used when the backend answers with nothing.
pub const EMPTY_REPLY: &str = "抱歉，我没有理解您的意思，请再说一遍。";

/// Routes assistant turns to the configured backend. Never fails.
#[derive(Clone)]
pub struct Router {
    backend: Arc<dyn ChatBackend>,
    options: ChatOptions,
}

impl Router {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            options: ChatOptions::assistant(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Builds `[system, ...history, user]`.
    pub fn build_messages(user_input: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(ASSISTANT_SYSTEM_PROMPT));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(user_input));
        messages
    }

    /// Returns the trimmed reply, or a fixed fallback sentence on any failure.
    pub async fn generate_response(&self, user_input: &str, history: &[ChatMessage]) -> String {
        let messages = Self::build_messages(user_input, history);
        match self.backend.chat(&messages, &self.options).await {
            Ok(resp) => {
                let text = resp.text.trim();
                if text.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    info!("{} replied {} chars", self.backend.name(), text.chars().count());
                    text.to_string()
                }
            }
            Err(e) => {
                error!("{} request failed: {}", self.backend.name(), e);
                NETWORK_FAILURE_REPLY.to_string()
            }
        }
    }
}
