//! WebSocket bridge servers.

use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use dhagent_bridge::{
    BridgeState, DEFAULT_GATEWAY_ADDR, DEFAULT_MCP_ADDR, DashScopeConnector, gateway_router,
    mcp_router,
};
use dhagent_services::serve;

use crate::Cli;
use crate::config::ServerConfig;

#[derive(Args)]
pub struct BridgeCommand {
    /// Listen address
    #[arg(long, default_value = DEFAULT_MCP_ADDR)]
    addr: String,
}

#[derive(Args)]
pub struct GatewayCommand {
    /// Listen address
    #[arg(long, default_value = DEFAULT_GATEWAY_ADDR)]
    addr: String,
}

fn bridge_state(cli: &Cli) -> anyhow::Result<BridgeState> {
    let cfg = ServerConfig::load(cli.config.as_deref())?;
    // Clients get the validation error on connect; warn early too.
    if let Err(e) = cfg.aliyun.validate() {
        warn!("{}", e);
    }
    let mut connector = DashScopeConnector::new(&cfg.aliyun.api_key);
    if !cfg.aliyun.workspace_id.is_empty() {
        connector = connector.with_workspace(&cfg.aliyun.workspace_id);
    }
    let connector = Arc::new(connector);
    Ok(BridgeState {
        mcp: cfg.aliyun,
        mcp_connector: connector.clone(),
        gateway_connector: connector,
    })
}

impl BridgeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let state = bridge_state(cli)?;
        info!("MCP bridge at ws://{}/mcp/multimodal", self.addr);
        serve(&self.addr, mcp_router(state)).await?;
        Ok(())
    }
}

impl GatewayCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let state = bridge_state(cli)?;
        info!("gateway at ws://{}/", self.addr);
        serve(&self.addr, gateway_router(state)).await?;
        Ok(())
    }
}
