//! HTTP glue services around the agent's models.
//!
//! - [`emotion`]: the emotion skill (`/manifest`, `/execute`)
//! - [`adapter`]: intent adapter for the multimodal interaction kit
//! - [`chat`]: OpenAI-style chat, vision, conversation and speech endpoints
//!
//! Each module exposes an axum [`Router`](axum::Router) with permissive CORS;
//! [`serve`] binds one to an address.

pub mod adapter;
mod card;
pub mod chat;
pub mod emotion;
mod server;

pub use adapter::AdapterConfig;
pub use card::{agent_card, agent_document, load_card};
pub use chat::{ChatApi, ChatUpstream, DashScopeUpstream};
pub use server::{CHAT_API_ADDR, EMOTION_SERVICE_ADDR, INTENT_ADAPTER_ADDR, listen_addr, serve};
