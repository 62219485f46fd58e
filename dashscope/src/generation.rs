//! Text generation (`POST /api/v1/services/aigc/text-generation/generation`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    http::HttpClient,
    types::{Message, Usage},
};

pub(crate) const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";

/// Text generation service.
pub struct GenerationService {
    http: Arc<HttpClient>,
}

impl GenerationService {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Calls the model once and returns the full response.
    pub async fn call(&self, req: &GenerationRequest) -> Result<GenerationResponse> {
        if req.model.is_empty() {
            return Err(Error::Config("model must be non-empty".to_string()));
        }
        self.http.post(GENERATION_PATH, req).await
    }

    /// Calls the model and returns the trimmed reply text.
    pub async fn text(&self, req: &GenerationRequest) -> Result<String> {
        let resp = self.call(req).await?;
        resp.text()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| Error::UnexpectedResponse("generation returned no text".to_string()))
    }
}

/// Generation request body.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub input: GenerationInput,
    pub parameters: GenerationParameters,
}

/// Either a message list or a bare prompt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationInput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationParameters {
    /// `message` makes the reply land in `output.choices`.
    pub result_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            result_format: "message".to_string(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            seed: None,
        }
    }
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            input: GenerationInput {
                messages,
                prompt: None,
            },
            parameters: GenerationParameters::default(),
        }
    }

    pub fn with_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: GenerationInput {
                messages: Vec::new(),
                prompt: Some(prompt.into()),
            },
            parameters: GenerationParameters::default(),
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.parameters.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.parameters.max_tokens = Some(n);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub output: GenerationOutput,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationOutput {
    /// Set when `result_format` is `text`.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: Message,
}

impl GenerationResponse {
    /// Reply text from the first choice, falling back to `output.text`.
    pub fn text(&self) -> Option<&str> {
        self.output
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .or(self.output.text.as_deref())
    }
}
