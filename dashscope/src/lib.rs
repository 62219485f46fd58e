//! DashScope (Aliyun Model Studio) client.
//!
//! Covers the slices of the platform the agent services use:
//!
//! - [`GenerationService`]: text generation (`qwen-plus`, `qwen-max`, ...)
//! - [`MultiModalService`]: vision-language and omni models
//! - [`DialogService`]: realtime multimodal dialog envelopes over WebSocket
//! - [`TtsService`]: Qwen TTS realtime, collected as 24 kHz PCM
//!
//! # Example
//!
//! ```rust,no_run
//! use dhagent_dashscope::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("sk-...")?;
//!     let pcm = client.tts().synthesize("你好", "").await?;
//!     println!("{} bytes of audio", pcm.len());
//!     Ok(())
//! }
//! ```

mod client;
pub mod dialog;
mod error;
mod event;
mod generation;
mod http;
mod multimodal;
mod tts;
mod types;
mod ws;

pub use client::{
    Client, ClientBuilder, DEFAULT_HTTP_BASE_URL, DEFAULT_INFERENCE_URL, DEFAULT_MAX_RETRIES,
    DEFAULT_REALTIME_URL,
};
pub use dialog::{
    DialogEvent, DialogEventKind, DialogMessage, DialogReceiver, DialogRequest, DialogSender,
    DialogService, DialogSession, DownstreamParams, StartParams, UpstreamParams,
};
pub use error::{Error, Result, error_code};
pub use event::*;
pub use generation::{
    Choice, GenerationInput, GenerationOutput, GenerationParameters, GenerationRequest,
    GenerationResponse, GenerationService,
};
pub use multimodal::{
    ContentItem, MultiModalMessage, MultiModalRequest, MultiModalResponse, MultiModalService,
};
pub use tts::{TTS_SAMPLE_RATE, TtsService, TtsSession, TtsSessionConfig};
pub use types::*;
pub use ws::Incoming;
