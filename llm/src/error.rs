//! Error types for LLM calls.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Non-2xx response from an OpenAI-compatible or Ark endpoint.
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    DashScope(#[from] dhagent_dashscope::Error),

    /// The response parsed but carried no reply text.
    #[error("empty response from {0}")]
    EmptyResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::DashScope(e) => e.is_retryable(),
            _ => false,
        }
    }
}
