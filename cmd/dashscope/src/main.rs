//! dhagent-dashscope: a command line client for the DashScope services the
//! agent uses.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ChatCommand, ConfigCommand, IntentCommand, TtsCommand, VlCommand};

/// Command line client for DashScope (Aliyun Model Studio).
///
/// Covers the calls the agent makes:
///   - Qwen text generation and intent detection
///   - Vision-language questions about an image
///   - Qwen TTS realtime synthesis to WAV
///
/// Configuration is stored in ~/.dhagent/dashscope/ and supports multiple
/// contexts, similar to kubectl's context management.
#[derive(Parser)]
#[command(name = "dhagent-dashscope")]
#[command(about = "DashScope (Aliyun Model Studio) CLI for the dhagent services")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.dhagent/dashscope/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Input request file (YAML or JSON)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Qwen text generation
    Chat(ChatCommand),
    /// Classify whether a question needs the camera image
    Intent(IntentCommand),
    /// Ask a vision-language model about an image
    Vl(VlCommand),
    /// Synthesize speech to a WAV file
    Tts(TtsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Chat(cmd) => cmd.run(&cli).await,
        Commands::Intent(cmd) => cmd.run(&cli).await,
        Commands::Vl(cmd) => cmd.run(&cli).await,
        Commands::Tts(cmd) => cmd.run(&cli).await,
    }
}
