use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Rejected before connecting upstream. The message is shown to the client.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    DashScope(#[from] dhagent_dashscope::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed")]
    Closed,
}
