//! dhagent: the agent's long-running services and batch tools.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{
    AskCommand, BridgeCommand, ChatCommand, ClassifyCommand, EmotionCommand, GatewayCommand,
    IntentCommand,
};

/// dhagent servers and tools.
///
/// Servers read secrets from the config file (-f/--config, YAML or JSON) and
/// fall back to DASHSCOPE_API_KEY, ALIYUN_API_KEY, ALIYUN_WORKSPACE_ID,
/// ALIYUN_APP_ID and DEFAULT_LLM.
#[derive(Parser)]
#[command(name = "dhagent")]
#[command(about = "Digital human agent services")]
#[command(version)]
pub struct Cli {
    /// Server config file (YAML or JSON)
    #[arg(long, short = 'f', global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// MCP WebSocket bridge to the realtime multimodal dialog
    Bridge(BridgeCommand),
    /// Envelope-preserving WebSocket gateway to the realtime multimodal dialog
    Gateway(GatewayCommand),
    /// Emotion skill HTTP service
    Emotion(EmotionCommand),
    /// Intent adapter HTTP service
    Intent(IntentCommand),
    /// OpenAI-style chat API
    Chat(ChatCommand),
    /// Classify every image in a folder and write a report
    Classify(ClassifyCommand),
    /// Talk to the assistant from the terminal
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match &cli.command {
        Commands::Bridge(cmd) => cmd.run(&cli).await,
        Commands::Gateway(cmd) => cmd.run(&cli).await,
        Commands::Emotion(cmd) => cmd.run(&cli).await,
        Commands::Intent(cmd) => cmd.run(&cli).await,
        Commands::Chat(cmd) => cmd.run(&cli).await,
        Commands::Classify(cmd) => cmd.run(&cli).await,
        Commands::Ask(cmd) => cmd.run(&cli).await,
    }
}
