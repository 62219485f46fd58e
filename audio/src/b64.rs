//! Base64 and data URL helpers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::Result;

/// Encodes bytes as standard base64.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes base64, accepting either a bare payload or a `data:<mime>;base64,` URL.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(strip_data_url(s).trim())?)
}

/// Returns the payload part of a `data:` URL, or the input unchanged.
pub fn strip_data_url(s: &str) -> &str {
    if s.starts_with("data:") {
        if let Some((_, payload)) = s.split_once(',') {
            return payload;
        }
    }
    s
}

/// Builds a `data:<mime>;base64,<payload>` URL.
pub fn data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, encode(data))
}
