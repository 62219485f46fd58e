//! The seam every chat provider implements.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatMessage, ChatOptions, ChatResponse};

/// A chat completion backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Model id requests go to.
    fn model(&self) -> &str;

    async fn chat(&self, messages: &[ChatMessage], opts: &ChatOptions) -> Result<ChatResponse>;
}
