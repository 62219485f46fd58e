//! "Answer from the camera image, or just chat?" classification.
//!
//! The model is told to reply with a bare `0` when the user wants an answer
//! grounded in an image; anything else is already the chat reply.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::ChatBackend;
use crate::types::{ChatMessage, ChatOptions};

/// System prompt that turns a chat model into an intent classifier.
pub const INTENT_SYSTEM_PROMPT: &str = concat!(
    "如果用户想让你通过图片回答则返回0，其他时候你是一个对话系统，并尽可能简要的回答问题，",
    "返回0示例：1，这是什么 2，你看前边风景怎么样形容一下？3，你面前有几个人 ，4，他在做什么 ， 我穿了什么颜色的衣服。 "
);

pub const DEFAULT_INTENT_MODEL: &str = "qwen-plus-2025-12-01";

/// Words that suggest the user is asking about what the camera sees.
pub const VISION_KEYWORDS: &[&str] = &[
    "这是什么", "看", "图片", "照片", "图像", "照片里", "图里", "前面", "风景", "几个人", "颜色",
];

/// Reply used by the keyword fallback when no image is needed.
pub const FALLBACK_CHAT_REPLY: &str = "好的，我理解您的问题。";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The question needs the image.
    Vision,
    /// Plain conversation; carries the model's reply.
    Chat(String),
}

impl Intent {
    pub fn is_vision(&self) -> bool {
        matches!(self, Intent::Vision)
    }

    /// Numeric code used on the wire: 0 for vision, 1 for chat.
    pub fn code(&self) -> u8 {
        match self {
            Intent::Vision => 0,
            Intent::Chat(_) => 1,
        }
    }
}

/// Maps a model reply to an intent. Only an exact `0` (after trimming) means vision.
pub fn classify_reply(reply: &str) -> Intent {
    if reply.trim() == "0" {
        Intent::Vision
    } else {
        Intent::Chat(reply.to_string())
    }
}

/// Local fallback used when the model can't be reached.
pub fn keyword_intent(text: &str) -> Intent {
    if VISION_KEYWORDS.iter().any(|k| text.contains(k)) {
        Intent::Vision
    } else {
        Intent::Chat(FALLBACK_CHAT_REPLY.to_string())
    }
}

#[derive(Clone)]
pub struct IntentDetector {
    backend: Arc<dyn ChatBackend>,
}

impl IntentDetector {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Classifies a single user utterance.
    pub async fn detect(&self, text: &str) -> Intent {
        self.detect_messages(&[ChatMessage::user(text)]).await
    }

    /// Classifies the last turn of a conversation. The intent prompt is prepended.
    pub async fn detect_messages(&self, messages: &[ChatMessage]) -> Intent {
        match self.ask(messages).await {
            Ok(reply) => {
                let intent = classify_reply(&reply);
                debug!("intent {} from model reply", intent.code());
                intent
            }
            Err(e) => {
                warn!("intent detection failed, using keyword fallback: {}", e);
                let last = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == crate::types::ROLE_USER)
                    .map(ChatMessage::text)
                    .unwrap_or_default();
                keyword_intent(&last)
            }
        }
    }

    /// Sends the prompt and returns the raw reply.
    pub async fn ask(&self, messages: &[ChatMessage]) -> crate::Result<String> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(ChatMessage::system(INTENT_SYSTEM_PROMPT));
        full.extend_from_slice(messages);
        let resp = self.backend.chat(&full, &ChatOptions::default()).await?;
        Ok(resp.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reply() {
        assert_eq!(classify_reply("0"), Intent::Vision);
        assert_eq!(classify_reply(" 0\n"), Intent::Vision);
        assert_eq!(classify_reply("00"), Intent::Chat("00".into()));
        assert_eq!(classify_reply("你好呀"), Intent::Chat("你好呀".into()));
    }

    #[test]
    fn test_keyword_intent() {
        assert!(keyword_intent("你看前面有什么").is_vision());
        assert!(keyword_intent("我穿的衣服什么颜色").is_vision());
        assert_eq!(
            keyword_intent("讲个笑话"),
            Intent::Chat(FALLBACK_CHAT_REPLY.to_string())
        );
    }

    #[test]
    fn test_intent_code() {
        assert_eq!(Intent::Vision.code(), 0);
        assert_eq!(Intent::Chat(String::new()).code(), 1);
    }
}
