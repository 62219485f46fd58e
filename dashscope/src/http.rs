//! HTTP transport with retry for DashScope REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    Client as ReqwestClient, Response,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    client::ClientConfig,
    error::{Error, Result},
    types::ErrorBody,
};

const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Delay before retry `attempt` (1-based): 0.5 s doubling, capped at 32 s.
fn retry_backoff(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_millis(BASE_BACKOFF_MS << shift)
}

pub(crate) struct HttpClient {
    client: ReqwestClient,
    config: Arc<ClientConfig>,
}

impl HttpClient {
    pub(crate) fn new(config: Arc<ClientConfig>) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, config })
    }

    /// POSTs a JSON body, retrying rate-limit and server errors with exponential backoff.
    pub(crate) async fn post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = retry_backoff(attempt);
                tokio::time::sleep(backoff).await;
            }

            match self.do_post(path, body).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() => {
                    warn!("dashscope {} attempt {} failed: {}", path, attempt + 1, e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Other("max retries exceeded".to_string())))
    }

    async fn do_post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.http_base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;

        handle_response(response).await
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|e| Error::Config(format!("invalid api key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref ws) = self.config.workspace_id {
            headers.insert(
                "X-DashScope-WorkSpace",
                HeaderValue::from_str(ws)
                    .map_err(|e| Error::Config(format!("invalid workspace id: {}", e)))?,
            );
        }
        Ok(headers)
    }
}

async fn handle_response<R: DeserializeOwned>(response: Response) -> Result<R> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(parse_error(&body, status.as_u16()));
    }

    Ok(serde_json::from_slice(&body)?)
}

/// Converts a non-2xx body into [`Error::Api`], keeping the raw text when it isn't JSON.
pub(crate) fn parse_error(body: &[u8], http_status: u16) -> Error {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(e) if !e.code.is_empty() || !e.message.is_empty() => Error::Api {
            code: e.code,
            message: e.message,
            request_id: e.request_id,
            http_status,
        },
        _ => Error::Api {
            code: String::new(),
            message: String::from_utf8_lossy(body).into_owned(),
            request_id: String::new(),
            http_status,
        },
    }
}
