use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub const ENV_ALIYUN_API_KEY: &str = "ALIYUN_API_KEY";
pub const ENV_ALIYUN_WORKSPACE_ID: &str = "ALIYUN_WORKSPACE_ID";
pub const ENV_ALIYUN_APP_ID: &str = "ALIYUN_APP_ID";

const WORKSPACE_PLACEHOLDER: &str = "your-workspace-id";
const APP_PLACEHOLDER: &str = "your-app-id";

/// Credentials and app identity for the MCP bridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub api_key: String,
    pub workspace_id: String,
    pub app_id: String,
}

impl McpConfig {
    /// Reads `ALIYUN_API_KEY`, `ALIYUN_WORKSPACE_ID` and `ALIYUN_APP_ID`.
    pub fn from_env() -> Self {
        let var = |k| std::env::var(k).unwrap_or_default();
        Self {
            api_key: var(ENV_ALIYUN_API_KEY),
            workspace_id: var(ENV_ALIYUN_WORKSPACE_ID),
            app_id: var(ENV_ALIYUN_APP_ID),
        }
    }

    /// Fills empty fields from the environment.
    pub fn with_env_fallback(mut self) -> Self {
        let env = Self::from_env();
        if self.api_key.is_empty() {
            self.api_key = env.api_key;
        }
        if self.workspace_id.is_empty() {
            self.workspace_id = env.workspace_id;
        }
        if self.app_id.is_empty() {
            self.app_id = env.app_id;
        }
        self
    }

    /// Checks the key shape and that workspace and app ids are real values.
    pub fn validate(&self) -> Result<()> {
        if !self.api_key.starts_with("sk-") {
            return Err(BridgeError::Config(
                "API密钥格式无效，请检查ALIYUN_API_KEY是否正确设置".to_string(),
            ));
        }
        if self.workspace_id.is_empty() || self.workspace_id == WORKSPACE_PLACEHOLDER {
            return Err(BridgeError::Config(
                "请设置ALIYUN_WORKSPACE_ID环境变量".to_string(),
            ));
        }
        if self.app_id.is_empty() || self.app_id == APP_PLACEHOLDER {
            return Err(BridgeError::Config("请设置ALIYUN_APP_ID环境变量".to_string()));
        }
        Ok(())
    }
}
