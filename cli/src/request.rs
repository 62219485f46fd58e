//! Request file loading.
//!
//! Commands accept `-f <file>` with a YAML or JSON body; `-f -` reads stdin.

use std::io::{self, Read};
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read request: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request is neither YAML nor JSON")]
    Unrecognized,
}

/// Loads a request from a file path, or from stdin when the path is `-`.
pub fn load_request<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, RequestError> {
    let path = path.as_ref();
    if path.as_os_str() == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        return parse_request(&data, path);
    }
    let data = std::fs::read(path)?;
    parse_request(&data, path)
}

/// Parses request bytes, choosing the format by extension and sniffing otherwise.
pub fn parse_request<T: DeserializeOwned>(
    data: &[u8],
    path: impl AsRef<Path>,
) -> Result<T, RequestError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("yaml" | "yml") => Ok(serde_yaml::from_slice(data)?),
        Some("json") => Ok(serde_json::from_slice(data)?),
        _ => serde_json::from_slice(data)
            .or_else(|_| serde_yaml::from_slice(data))
            .map_err(|_| RequestError::Unrecognized),
    }
}
