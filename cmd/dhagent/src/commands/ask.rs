//! Terminal conversation with the voice-assistant router.

use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use dhagent_llm::{ChatMessage, Provider, Router};

use crate::Cli;
use crate::config::ServerConfig;

/// Turns of history kept between prompts.
const MAX_HISTORY_TURNS: usize = 10;

#[derive(Args)]
pub struct AskCommand {
    /// Ask one question and exit instead of reading stdin
    prompt: Option<String>,
    /// Provider (deepseek, doubao, qwen); defaults to DEFAULT_LLM
    #[arg(long)]
    provider: Option<String>,
}

impl AskCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = ServerConfig::load(cli.config.as_deref())?;
        let provider = Provider::parse(self.provider.as_deref().unwrap_or(&cfg.default_llm));
        let backend = if provider == Provider::Qwen {
            provider.backend(cfg.dashscope_key()?)?
        } else {
            provider.backend_from_env()?
        };
        info!("provider: {}", provider);
        let router = Router::new(backend);

        if let Some(prompt) = &self.prompt {
            println!("{}", router.generate_response(prompt, &[]).await);
            return Ok(());
        }

        let mut history: Vec<ChatMessage> = Vec::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if matches!(input, "exit" | "quit") {
                break;
            }

            let reply = router.generate_response(input, &history).await;
            stdout.write_all(format!("{}\n", reply).as_bytes()).await?;

            history.push(ChatMessage::user(input));
            history.push(ChatMessage::assistant(reply));
            trim_history(&mut history, MAX_HISTORY_TURNS);
        }
        Ok(())
    }
}

/// Drops the oldest user/assistant pairs beyond `max_turns`.
fn trim_history(history: &mut Vec<ChatMessage>, max_turns: usize) {
    let max = max_turns * 2;
    if history.len() > max {
        history.drain(..history.len() - max);
    }
}
