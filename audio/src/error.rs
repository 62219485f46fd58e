use thiserror::Error;

/// Result type alias for audio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while converting audio payloads.
#[derive(Debug, Error)]
pub enum Error {
    #[error("wav: {0}")]
    InvalidWav(String),

    #[error("wav: unsupported encoding (format={format}, bits={bits})")]
    UnsupportedWav { format: u16, bits: u16 },

    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
