use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmotionError>;

/// Errors returned by emotion detection.
#[derive(Debug, Error)]
pub enum EmotionError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model error: {0}")]
    Model(String),

    /// The model produced logits of the wrong length.
    #[error("expected {expected} logits, got {got}")]
    OutputShape { expected: usize, got: usize },
}

impl EmotionError {
    pub(crate) fn model(e: impl std::fmt::Display) -> Self {
        EmotionError::Model(e.to_string())
    }
}
