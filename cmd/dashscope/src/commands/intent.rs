//! Vision-or-chat intent detection.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use dhagent_llm::intent::DEFAULT_INTENT_MODEL;
use dhagent_llm::{IntentDetector, QwenBackend};

use super::{create_client, get_context, output, pick};
use crate::Cli;

/// Ask the intent model whether a question needs the camera image.
///
/// Prints `intent: 0` for image questions; otherwise `intent: 1` with the
/// model's direct reply.
#[derive(Args)]
pub struct IntentCommand {
    /// The user's utterance
    text: String,
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntentResult {
    intent: u8,
    vision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
}

impl IntentCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(&ctx)?;
        // The context's default model is for chat, not classification.
        let model = pick(self.model.as_deref(), "", DEFAULT_INTENT_MODEL);
        let detector = IntentDetector::new(Arc::new(QwenBackend::new(client, model)));

        let intent = detector.detect(&self.text).await;
        let result = IntentResult {
            intent: intent.code(),
            vision: intent.is_vision(),
            reply: match intent {
                dhagent_llm::Intent::Chat(reply) => Some(reply),
                dhagent_llm::Intent::Vision => None,
            },
        };
        output(cli).write(&result)
    }
}
