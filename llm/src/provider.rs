//! Named chat providers and their defaults.

use std::fmt;
use std::sync::Arc;

use crate::backend::ChatBackend;
use crate::error::{Error, Result};
use crate::openai::{ARK_BASE_URL, DEEPSEEK_BASE_URL, OpenAICompatClient, OpenAIConfig};
use crate::qwen::QwenBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    DeepSeek,
    Doubao,
    Qwen,
}

impl Provider {
    /// Parses a provider name case-insensitively. Unknown names fall back to DeepSeek.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "doubao" | "ark" => Provider::Doubao,
            "qwen" | "dashscope" => Provider::Qwen,
            _ => Provider::DeepSeek,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek",
            Provider::Doubao => "doubao",
            Provider::Qwen => "qwen",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek-chat",
            Provider::Doubao => "doubao-1-5-vision-pro-32k-250115",
            Provider::Qwen => "qwen-plus",
        }
    }

    /// Base URL for OpenAI-compatible providers; Qwen goes through DashScope.
    pub fn base_url(&self) -> Option<&'static str> {
        match self {
            Provider::DeepSeek => Some(DEEPSEEK_BASE_URL),
            Provider::Doubao => Some(ARK_BASE_URL),
            Provider::Qwen => None,
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::Doubao => "DOUBAO_API_KEY",
            Provider::Qwen => "DASHSCOPE_API_KEY",
        }
    }

    /// Builds a backend with the provider's default model.
    pub fn backend(&self, api_key: &str) -> Result<Arc<dyn ChatBackend>> {
        self.backend_with_model(api_key, self.default_model())
    }

    pub fn backend_with_model(&self, api_key: &str, model: &str) -> Result<Arc<dyn ChatBackend>> {
        if api_key.is_empty() {
            return Err(Error::Config(format!(
                "{} api key is empty (set {})",
                self.as_str(),
                self.api_key_env()
            )));
        }
        let model = if model.is_empty() {
            self.default_model()
        } else {
            model
        };
        Ok(match self.base_url() {
            Some(base_url) => Arc::new(OpenAICompatClient::with_provider(
                self.as_str(),
                OpenAIConfig {
                    api_key: api_key.to_string(),
                    base_url: base_url.to_string(),
                    model: model.to_string(),
                },
            )),
            None => Arc::new(QwenBackend::new(
                dhagent_dashscope::Client::new(api_key)?,
                model,
            )),
        })
    }

    /// Builds a backend reading the key from the provider's environment variable.
    pub fn backend_from_env(&self) -> Result<Arc<dyn ChatBackend>> {
        let key = std::env::var(self.api_key_env()).unwrap_or_default();
        self.backend(&key)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_fallback() {
        assert_eq!(Provider::parse("DouBao"), Provider::Doubao);
        assert_eq!(Provider::parse(" qwen "), Provider::Qwen);
        assert_eq!(Provider::parse("deepseek"), Provider::DeepSeek);
        assert_eq!(Provider::parse("gpt-5"), Provider::DeepSeek);
        assert_eq!(Provider::parse(""), Provider::DeepSeek);
    }

    #[test]
    fn test_backend_construction() {
        let ds = Provider::DeepSeek.backend("sk-x").unwrap();
        assert_eq!(ds.name(), "deepseek");
        assert_eq!(ds.model(), "deepseek-chat");

        let qwen = Provider::Qwen.backend_with_model("sk-x", "qwen-max").unwrap();
        assert_eq!(qwen.name(), "qwen");
        assert_eq!(qwen.model(), "qwen-max");

        assert!(matches!(Provider::Doubao.backend(""), Err(Error::Config(_))));
    }
}
