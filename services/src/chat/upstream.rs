//! The model calls behind the chat API.

use async_trait::async_trait;
use dhagent_dashscope::{
    Client, Error, GenerationRequest, GenerationResponse, MultiModalRequest, Result,
};

/// DashScope operations the chat API needs.
#[async_trait]
pub trait ChatUpstream: Send + Sync {
    /// Text generation; returns the full response with request id and usage.
    async fn call(&self, req: GenerationRequest) -> Result<GenerationResponse>;

    /// Text generation; returns the trimmed reply text.
    async fn generate(&self, req: GenerationRequest) -> Result<String> {
        let resp = self.call(req).await?;
        resp.text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| Error::UnexpectedResponse("generation returned no text".to_string()))
    }

    /// Multimodal conversation; returns the first text item of the reply.
    async fn converse(&self, req: MultiModalRequest) -> Result<String>;

    /// Speech synthesis; returns 24 kHz mono 16-bit PCM. An empty voice
    /// selects the service default.
    async fn speak(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}

pub struct DashScopeUpstream {
    client: Client,
}

impl DashScopeUpstream {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatUpstream for DashScopeUpstream {
    async fn call(&self, req: GenerationRequest) -> Result<GenerationResponse> {
        self.client.generation().call(&req).await
    }

    async fn converse(&self, req: MultiModalRequest) -> Result<String> {
        self.client.multimodal().text(&req).await
    }

    async fn speak(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        self.client.tts().synthesize(text, voice).await
    }
}
