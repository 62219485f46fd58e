//! Audio byte helpers.
//!
//! Vendor speech APIs exchange audio as raw 16-bit PCM, WAV files or base64
//! strings. This crate converts between those representations:
//!
//! - [`Format`]: sample rate and channel layout of 16-bit PCM
//! - [`wav`]: RIFF/WAVE encoding and decoding
//! - [`b64`]: base64 and `data:` URL helpers
//!
//! # Example
//!
//! ```rust
//! use dhagent_audio::{wav, Format};
//! use std::time::Duration;
//!
//! let format = Format::MONO_24K;
//! let pcm = vec![0u8; format.bytes_in_duration(Duration::from_millis(100))];
//! let file = wav::encode(format, &pcm);
//! let (decoded_format, decoded) = wav::decode(&file).unwrap();
//! assert_eq!(decoded_format, format);
//! assert_eq!(decoded.len(), pcm.len());
//! ```

pub mod b64;
mod error;
mod format;
pub mod wav;

pub use error::{Error, Result};
pub use format::Format;
