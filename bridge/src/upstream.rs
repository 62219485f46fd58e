//! Upstream connections to the DashScope dialog endpoint.

use async_trait::async_trait;
use dhagent_dashscope::{Client, Incoming};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::Frame;

const LINK_BUFFER: usize = 100;

/// Both directions of one upstream WebSocket.
pub struct UpstreamLink {
    pub tx: mpsc::Sender<Frame>,
    pub rx: mpsc::Receiver<Frame>,
}

/// Opens upstream connections. One call, one socket.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<UpstreamLink>;
}

/// Connects to the DashScope inference WebSocket with bearer auth.
#[derive(Debug, Clone)]
pub struct DashScopeConnector {
    api_key: String,
    workspace_id: Option<String>,
    url: Option<String>,
}

impl DashScopeConnector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            workspace_id: None,
            url: None,
        }
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// Overrides the inference URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    fn client(&self) -> Result<Client> {
        let mut builder = Client::builder(self.api_key.clone());
        if let Some(ws) = &self.workspace_id {
            builder = builder.workspace(ws.clone());
        }
        if let Some(url) = &self.url {
            builder = builder.inference_url(url.clone());
        }
        Ok(builder.build()?)
    }
}

#[async_trait]
impl Connector for DashScopeConnector {
    async fn connect(&self) -> Result<UpstreamLink> {
        let (sender, mut receiver) = self.client()?.dialog().connect().await?.split();

        let (to_up_tx, mut to_up_rx) = mpsc::channel::<Frame>(LINK_BUFFER);
        let (from_up_tx, from_up_rx) = mpsc::channel::<Frame>(LINK_BUFFER);

        tokio::spawn(async move {
            while let Some(frame) = to_up_rx.recv().await {
                let sent = match frame {
                    Frame::Text(text) => sender.send_text(text).await,
                    Frame::Binary(data) => sender.send_audio(data).await,
                    Frame::Close => break,
                };
                if let Err(e) = sent {
                    warn!("upstream write failed: {}", e);
                    break;
                }
            }
            sender.close().await;
            debug!("upstream writer exited");
        });

        tokio::spawn(async move {
            while let Some(incoming) = receiver.recv_raw().await {
                let frame = match incoming {
                    Ok(Incoming::Text(text)) => Frame::Text(text),
                    Ok(Incoming::Binary(data)) => Frame::Binary(data),
                    Err(e) => {
                        warn!("upstream read failed: {}", e);
                        break;
                    }
                };
                if from_up_tx.send(frame).await.is_err() {
                    break;
                }
            }
            if from_up_tx.send(Frame::Close).await.is_err() {
                debug!("upstream close not delivered, bridge already gone");
            }
            debug!("upstream reader exited");
        });

        Ok(UpstreamLink {
            tx: to_up_tx,
            rx: from_up_rx,
        })
    }
}
