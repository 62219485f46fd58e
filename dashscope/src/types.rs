//! Shared constants and payload types.

use serde::{Deserialize, Serialize};

// Models
pub const MODEL_QWEN_PLUS: &str = "qwen-plus";
pub const MODEL_QWEN_PLUS_2025_12_01: &str = "qwen-plus-2025-12-01";
pub const MODEL_QWEN_MAX: &str = "qwen-max";
pub const MODEL_QWEN_VL_PLUS: &str = "qwen-vl-plus";
pub const MODEL_QWEN3_VL_PLUS: &str = "qwen3-vl-plus";
pub const MODEL_QWEN3_OMNI_FLASH: &str = "qwen3-omni-flash-2025-12-01";
pub const MODEL_QWEN3_TTS_FLASH_REALTIME: &str = "qwen3-tts-flash-realtime-2025-11-27";
pub const MODEL_MULTIMODAL_DIALOG: &str = "multimodal-dialog";

// Voices
pub const VOICE_LONGXIAOCHUN_V2: &str = "longxiaochun_v2";
pub const VOICE_CHERRY: &str = "Cherry";
pub const VOICE_LONGHUA: &str = "Longhua";

/// Chat message with plain text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Token usage reported by HTTP endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Error body returned by DashScope HTTP endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
}
