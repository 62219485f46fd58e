//! DashScope API client.

use std::sync::Arc;

use crate::{
    dialog::DialogService,
    error::{Error, Result},
    generation::GenerationService,
    http::HttpClient,
    multimodal::MultiModalService,
    tts::TtsService,
};

/// Default WebSocket endpoint for realtime models (Qwen TTS realtime).
pub const DEFAULT_REALTIME_URL: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/realtime";

/// Default WebSocket endpoint for the multimodal dialog task API.
pub const DEFAULT_INFERENCE_URL: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/inference";

/// Default HTTP endpoint.
pub const DEFAULT_HTTP_BASE_URL: &str = "https://dashscope.aliyuncs.com";

/// Default maximum number of retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// DashScope API client.
///
/// Cheap to clone; services share the configuration and HTTP connection pool.
///
/// ```rust,no_run
/// use dhagent_dashscope::{Client, GenerationRequest, Message};
///
/// # async fn run() -> dhagent_dashscope::Result<()> {
/// let client = Client::new("sk-...")?;
/// let resp = client
///     .generation()
///     .call(&GenerationRequest::new("qwen-plus", vec![Message::user("你好")]))
///     .await?;
/// println!("{}", resp.text().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http: Arc<HttpClient>,
}

#[derive(Clone)]
pub(crate) struct ClientConfig {
    pub(crate) api_key: String,
    pub(crate) workspace_id: Option<String>,
    pub(crate) realtime_url: String,
    pub(crate) inference_url: String,
    pub(crate) http_base_url: String,
    pub(crate) max_retries: u32,
}

impl Client {
    /// Creates a client with default endpoints.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    pub fn workspace_id(&self) -> Option<&str> {
        self.config.workspace_id.as_deref()
    }

    pub fn http_base_url(&self) -> &str {
        &self.config.http_base_url
    }

    /// Text generation (`Generation`).
    pub fn generation(&self) -> GenerationService {
        GenerationService::new(self.http.clone())
    }

    /// Vision-language and omni models (`MultiModalConversation`).
    pub fn multimodal(&self) -> MultiModalService {
        MultiModalService::new(self.http.clone())
    }

    /// Realtime multimodal dialog over the inference WebSocket.
    pub fn dialog(&self) -> DialogService {
        DialogService::new(self.config.clone())
    }

    /// Qwen TTS realtime over the realtime WebSocket.
    pub fn tts(&self) -> TtsService {
        TtsService::new(self.config.clone())
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    api_key: String,
    workspace_id: Option<String>,
    realtime_url: String,
    inference_url: String,
    http_base_url: String,
    max_retries: u32,
}

impl ClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            workspace_id: None,
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            http_base_url: DEFAULT_HTTP_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets the workspace id, sent as `X-DashScope-WorkSpace`.
    pub fn workspace(mut self, workspace_id: impl Into<String>) -> Self {
        let id = workspace_id.into();
        self.workspace_id = (!id.is_empty()).then_some(id);
        self
    }

    pub fn realtime_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_url = url.into();
        self
    }

    pub fn inference_url(mut self, url: impl Into<String>) -> Self {
        self.inference_url = url.into();
        self
    }

    pub fn http_base_url(mut self, url: impl Into<String>) -> Self {
        self.http_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the maximum number of retries for transient HTTP errors.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<Client> {
        if self.api_key.is_empty() {
            return Err(Error::Config("api_key must be non-empty".to_string()));
        }

        let config = Arc::new(ClientConfig {
            api_key: self.api_key,
            workspace_id: self.workspace_id,
            realtime_url: self.realtime_url,
            inference_url: self.inference_url,
            http_base_url: self.http_base_url,
            max_retries: self.max_retries,
        });
        let http = Arc::new(HttpClient::new(config.clone())?);

        Ok(Client { config, http })
    }
}
