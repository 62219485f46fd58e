//! WebSocket bridges in front of the DashScope realtime multimodal dialog.
//!
//! - [`mcp`]: the flat `{type, payload}` dialect, one upstream task per client
//! - [`gateway`]: the native envelope with per-task id and dialog-id rewriting
//!
//! Both bridges are pumps over [`Frame`] channels and open upstream sockets
//! through a [`Connector`], so they run the same over axum or in tests.

mod config;
mod error;
mod frame;
pub mod gateway;
pub mod mcp;
mod server;
mod upstream;

pub use config::{ENV_ALIYUN_API_KEY, ENV_ALIYUN_APP_ID, ENV_ALIYUN_WORKSPACE_ID, McpConfig};
pub use error::{BridgeError, Result};
pub use frame::Frame;
pub use gateway::{TaskMap, TaskMapping, run_gateway};
pub use mcp::run_mcp;
pub use server::{
    BridgeState, DEFAULT_GATEWAY_ADDR, DEFAULT_MCP_ADDR, gateway_router, mcp_router,
};
pub use upstream::{Connector, DashScopeConnector, UpstreamLink};
