//! Server configuration: an optional YAML/JSON file, then environment
//! variables for anything left empty.

use std::path::PathBuf;

use serde::Deserialize;

use dhagent_bridge::McpConfig;
use dhagent_cli::load_request;

pub const ENV_DASHSCOPE_API_KEY: &str = "DASHSCOPE_API_KEY";
pub const ENV_DEFAULT_LLM: &str = "DEFAULT_LLM";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Key for Generation, MultiModalConversation and TTS.
    pub dashscope_api_key: String,
    /// Credentials for the realtime multimodal dialog bridges.
    pub aliyun: McpConfig,
    pub emotion: EmotionFiles,
    /// `deepseek`, `doubao` or `qwen`.
    pub default_llm: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmotionFiles {
    pub model: Option<PathBuf>,
    pub preprocessor_config: Option<PathBuf>,
    /// UltraFace ONNX model; without it every image is assumed to hold a face.
    pub face_model: Option<PathBuf>,
}

impl ServerConfig {
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let cfg: Self = match path {
            Some(p) => load_request(p)?,
            None => Self::default(),
        };
        Ok(cfg.with_env_fallback())
    }

    pub fn with_env_fallback(mut self) -> Self {
        if self.dashscope_api_key.is_empty() {
            self.dashscope_api_key = std::env::var(ENV_DASHSCOPE_API_KEY).unwrap_or_default();
        }
        if self.default_llm.is_empty() {
            self.default_llm = std::env::var(ENV_DEFAULT_LLM).unwrap_or_default();
        }
        self.aliyun = self.aliyun.with_env_fallback();
        self
    }

    /// The DashScope key, falling back to the Aliyun dialog key.
    pub fn dashscope_key(&self) -> anyhow::Result<&str> {
        [self.dashscope_api_key.as_str(), self.aliyun.api_key.as_str()]
            .into_iter()
            .find(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} is not set", ENV_DASHSCOPE_API_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(
            &path,
            "dashscope_api_key: sk-file\naliyun:\n  workspace_id: ws\nemotion:\n  model: /m/emotion.onnx\ndefault_llm: qwen\n",
        )
        .unwrap();

        let cfg = ServerConfig::load(path.to_str()).unwrap();
        assert_eq!(cfg.dashscope_api_key, "sk-file");
        assert_eq!(cfg.aliyun.workspace_id, "ws");
        assert_eq!(cfg.emotion.model, Some(PathBuf::from("/m/emotion.onnx")));
        assert_eq!(cfg.default_llm, "qwen");
        assert_eq!(cfg.dashscope_key().unwrap(), "sk-file");
    }

    #[test]
    fn test_dashscope_key_falls_back_to_aliyun() {
        let cfg = ServerConfig {
            aliyun: McpConfig {
                api_key: "sk-aliyun".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(cfg.dashscope_key().unwrap(), "sk-aliyun");
    }
}
