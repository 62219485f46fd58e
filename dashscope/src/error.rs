//! Error types for the DashScope client.

use thiserror::Error;

/// Common error codes from DashScope.
pub mod error_code {
    // Authentication
    pub const INVALID_API_KEY: &str = "InvalidApiKey";
    pub const ACCESS_DENIED: &str = "AccessDenied";
    pub const WORKSPACE_NOT_FOUND: &str = "WorkspaceNotFound";

    // Rate limiting
    pub const THROTTLING: &str = "Throttling";
    pub const RATE_LIMIT_EXCEEDED: &str = "Throttling.RateQuota";
    pub const QUOTA_EXCEEDED: &str = "Throttling.AllocationQuota";

    // Request errors
    pub const INVALID_PARAMETER: &str = "InvalidParameter";
    pub const DATA_INSPECTION_FAILED: &str = "DataInspectionFailed";
    pub const MODEL_NOT_FOUND: &str = "ModelNotFound";

    // Server errors
    pub const INTERNAL_ERROR: &str = "InternalError";
    pub const SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";
}

/// Result type alias for DashScope operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// API error returned by DashScope, over HTTP or inside a WebSocket event.
    #[error("dashscope: {code} - {message} (request_id={request_id}, http_status={http_status})")]
    Api {
        code: String,
        message: String,
        request_id: String,
        http_status: u16,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// The response parsed but did not contain the expected field.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("session closed")]
    SessionClosed,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an API error without a request id.
    pub fn api(code: impl Into<String>, message: impl Into<String>, http_status: u16) -> Self {
        Error::Api {
            code: code.into(),
            message: message.into(),
            request_id: String::new(),
            http_status,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        match self {
            Error::Api { code, http_status, .. } => {
                code.starts_with(error_code::THROTTLING) || *http_status == 429
            }
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        match self {
            Error::Api { code, http_status, .. } => {
                code == error_code::INVALID_API_KEY
                    || code == error_code::ACCESS_DENIED
                    || code == error_code::WORKSPACE_NOT_FOUND
                    || *http_status == 401
                    || *http_status == 403
            }
            _ => false,
        }
    }

    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Api { code, http_status, .. } => {
                code == error_code::INTERNAL_ERROR
                    || code == error_code::SERVICE_UNAVAILABLE
                    || *http_status >= 500
            }
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns true if the request can be retried.
    pub fn is_retryable(&self) -> bool {
        self.is_rate_limit() || self.is_server_error()
    }
}
