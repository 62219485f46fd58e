//! Qwen text generation.

use clap::Args;
use serde::{Deserialize, Serialize};

use dhagent_cli::load_request;
use dhagent_dashscope::{GenerationRequest, MODEL_QWEN_PLUS, Message};

use super::{create_client, get_context, output, pick, print_verbose};
use crate::Cli;

/// Send a prompt (or a request file with a message list) to a Qwen model.
#[derive(Args)]
pub struct ChatCommand {
    /// User prompt (ignored when -f is given)
    prompt: Option<String>,
    /// Model (overrides the context default)
    #[arg(long)]
    model: Option<String>,
    /// System prompt
    #[arg(long)]
    system: Option<String>,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    max_tokens: Option<u32>,
}

/// Request file body.
#[derive(Debug, Default, Deserialize)]
struct ChatFile {
    #[serde(default)]
    model: String,
    messages: Vec<Message>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatResult {
    model: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<String>,
    input_tokens: u32,
    output_tokens: u32,
}

impl ChatCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;

        let file = match &cli.input {
            Some(path) => load_request::<ChatFile>(path)?,
            None => {
                let prompt = self
                    .prompt
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("prompt is required, or use -f"))?;
                let mut messages = Vec::new();
                if let Some(system) = &self.system {
                    messages.push(Message::system(system));
                }
                messages.push(Message::user(prompt));
                ChatFile {
                    messages,
                    ..Default::default()
                }
            }
        };

        let flag_model = self.model.as_deref().or(Some(file.model.as_str()));
        let model = pick(flag_model, &ctx.default_model, MODEL_QWEN_PLUS);
        let mut req = GenerationRequest::new(&model, file.messages);
        req.parameters.temperature = self.temperature.or(file.temperature);
        req.parameters.max_tokens = self.max_tokens.or(file.max_tokens);
        print_verbose(cli, &format!("model: {}, {} messages", model, req.input.messages.len()));

        let resp = client.generation().call(&req).await?;
        let usage = resp.usage.clone().unwrap_or_default();
        let result = ChatResult {
            model,
            text: resp.text().unwrap_or_default().to_string(),
            finish_reason: resp
                .output
                .choices
                .first()
                .and_then(|c| c.finish_reason.clone()),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        };
        output(cli).write(&result)
    }
}
