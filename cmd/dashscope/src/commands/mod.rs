//! CLI commands module.

mod chat;
mod config;
mod intent;
mod tts;
mod util;
mod vl;

pub use chat::ChatCommand;
pub use config::ConfigCommand;
pub use intent::IntentCommand;
pub use tts::TtsCommand;
pub use vl::VlCommand;

pub(crate) use util::*;
