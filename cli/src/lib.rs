//! Shared CLI plumbing for dhagent binaries.
//!
//! Configuration contexts, request files and result output.

pub mod config;
pub mod output;
pub mod paths;
pub mod request;

pub use config::{load_config, mask_api_key, Config, Context};
pub use output::{guess_extension, write_binary, Output, OutputFormat};
pub use paths::Paths;
pub use request::{load_request, RequestError};
