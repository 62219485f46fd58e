//! HTTP services: emotion skill, intent adapter and chat API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use dhagent_dashscope::Client;
use dhagent_emotion::EmotionSkill;
use dhagent_services::adapter::{DEFAULT_AGENTCARD_FILE, DEFAULT_EMOTION_SERVICE_URL, DEFAULT_PUBLIC_URL};
use dhagent_services::{
    AdapterConfig, CHAT_API_ADDR, ChatApi, DashScopeUpstream, EMOTION_SERVICE_ADDR,
    INTENT_ADAPTER_ADDR, adapter, emotion, listen_addr, serve,
};

use super::load_detector;
use crate::Cli;
use crate::config::{EmotionFiles, ServerConfig};

/// Model paths given on the command line, overriding the config file.
#[derive(Args, Default)]
pub struct ModelArgs {
    /// Emotion classifier ONNX model
    #[arg(long)]
    model: Option<PathBuf>,
    /// Image preprocessor config (JSON)
    #[arg(long)]
    preprocessor: Option<PathBuf>,
    /// UltraFace ONNX model for the face gate
    #[arg(long)]
    face_model: Option<PathBuf>,
}

impl ModelArgs {
    pub(crate) fn merge(&self, mut files: EmotionFiles) -> EmotionFiles {
        if self.model.is_some() {
            files.model = self.model.clone();
        }
        if self.preprocessor.is_some() {
            files.preprocessor_config = self.preprocessor.clone();
        }
        if self.face_model.is_some() {
            files.face_model = self.face_model.clone();
        }
        files
    }
}

#[derive(Args)]
pub struct EmotionCommand {
    #[command(flatten)]
    models: ModelArgs,
    /// Listen address (":8089" binds all interfaces)
    #[arg(long, default_value = EMOTION_SERVICE_ADDR)]
    addr: String,
}

impl EmotionCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = ServerConfig::load(cli.config.as_deref())?;
        let detector = load_detector(&self.models.merge(cfg.emotion))?;
        let addr = listen_addr(&self.addr);
        info!("emotion skill service at http://{}", addr);
        serve(&addr, emotion::router(EmotionSkill::new(detector))).await?;
        Ok(())
    }
}

#[derive(Args)]
pub struct IntentCommand {
    /// Listen address
    #[arg(long, default_value = INTENT_ADAPTER_ADDR)]
    addr: String,
    /// Emotion service base URL
    #[arg(long, default_value = DEFAULT_EMOTION_SERVICE_URL)]
    emotion_url: String,
    /// URL advertised in the agent card
    #[arg(long, default_value = DEFAULT_PUBLIC_URL)]
    public_url: String,
    /// Agent card JSON served at /agentcard
    #[arg(long, default_value = DEFAULT_AGENTCARD_FILE)]
    agentcard: PathBuf,
}

impl IntentCommand {
    pub async fn run(&self, _cli: &Cli) -> anyhow::Result<()> {
        let config = AdapterConfig {
            emotion_service_url: self.emotion_url.trim_end_matches('/').to_string(),
            public_url: self.public_url.clone(),
            agentcard_path: self.agentcard.clone(),
        };
        let addr = listen_addr(&self.addr);
        info!(
            "intent adapter at http://{} (emotion service {})",
            addr, config.emotion_service_url
        );
        serve(&addr, adapter::router(config)).await?;
        Ok(())
    }
}

#[derive(Args)]
pub struct ChatCommand {
    /// Listen address
    #[arg(long, default_value = CHAT_API_ADDR)]
    addr: String,
    #[command(flatten)]
    models: ModelArgs,
    /// Attach synthesized speech to conversation replies
    #[arg(long)]
    speak: bool,
    /// TTS voice
    #[arg(long)]
    voice: Option<String>,
}

impl ChatCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = ServerConfig::load(cli.config.as_deref())?;
        let client = Client::builder(cfg.dashscope_key()?).build()?;

        let mut api = ChatApi::new(Arc::new(DashScopeUpstream::new(client)))
            .with_spoken_replies(self.speak);
        if let Some(voice) = &self.voice {
            api = api.with_voice(voice.clone());
        }

        let files = self.models.merge(cfg.emotion);
        if files.model.is_some() {
            api = api.with_emotion(load_detector(&files)?);
        } else {
            info!("no emotion model configured; image turns skip emotion context");
        }

        let addr = listen_addr(&self.addr);
        info!("chat API at http://{}/v1", addr);
        serve(&addr, api.router()).await?;
        Ok(())
    }
}
