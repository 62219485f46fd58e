//! LLM access for the agent.
//!
//! - [`OpenAICompatClient`]: DeepSeek, Ark and DashScope compatible-mode chat
//! - [`ArkResponsesClient`]: Doubao vision through the Ark Responses API
//! - [`QwenBackend`]: Qwen through DashScope `Generation`
//! - [`Router`]: assistant replies with a fixed fallback
//! - [`IntentDetector`]: vision-or-chat routing
//!
//! All chat providers implement [`ChatBackend`], so the router and the intent
//! detector work with any of them.

mod ark;
mod backend;
mod error;
pub mod intent;
mod openai;
mod provider;
mod qwen;
pub mod router;
mod types;

pub use ark::{ARK_DEFAULT_VISION_MODEL, ArkResponsesClient, extract_output_text};
pub use backend::ChatBackend;
pub use error::{Error, Result};
pub use intent::{Intent, IntentDetector};
pub use openai::{
    ARK_BASE_URL, DASHSCOPE_COMPATIBLE_BASE_URL, DEEPSEEK_BASE_URL, OpenAICompatClient,
    OpenAIConfig,
};
pub use provider::Provider;
pub use qwen::QwenBackend;
pub use router::Router;
pub use types::*;
