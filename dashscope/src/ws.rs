//! Authenticated WebSocket plumbing shared by the dialog and TTS sessions.

use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, client::IntoClientRequest},
};
use tracing::{debug, error};

use crate::{
    client::ClientConfig,
    error::{Error, Result},
};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Text(String),
    Binary(Vec<u8>),
}

/// A connected socket driven by background read and write tasks.
pub(crate) struct Connection {
    pub(crate) write_tx: mpsc::Sender<Message>,
    pub(crate) read_rx: mpsc::Receiver<Result<Incoming>>,
    pub(crate) read_handle: JoinHandle<()>,
    pub(crate) write_handle: JoinHandle<()>,
}

/// Opens `url` with `Authorization: Bearer` and the optional workspace header.
pub(crate) async fn connect(config: &ClientConfig, url: &str) -> Result<Connection> {
    debug!("connecting to {}", url);

    let mut request = url
        .into_client_request()
        .map_err(|e| Error::Connection(format!("invalid url {}: {}", url, e)))?;
    let headers = request.headers_mut();
    headers.insert(
        "Authorization",
        HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| Error::Config(format!("invalid api key: {}", e)))?,
    );
    if let Some(ref ws) = config.workspace_id {
        headers.insert(
            "X-DashScope-WorkSpace",
            HeaderValue::from_str(ws)
                .map_err(|e| Error::Config(format!("invalid workspace id: {}", e)))?,
        );
    }

    let (stream, _response) = connect_async(request)
        .await
        .map_err(|e| Error::Connection(format!("failed to connect: {}", e)))?;

    let (write, read) = stream.split();
    let (write_tx, write_rx) = mpsc::channel(100);
    let (read_tx, read_rx) = mpsc::channel(100);

    let write_handle = tokio::spawn(write_loop(write, write_rx));
    let read_handle = tokio::spawn(read_loop(read, read_tx));

    Ok(Connection {
        write_tx,
        read_rx,
        read_handle,
        write_handle,
    })
}

async fn write_loop(
    mut write: futures::stream::SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Message::Close(_) = msg {
            if let Err(e) = write.close().await {
                debug!("close error: {}", e);
            }
            break;
        }
        if let Err(e) = write.send(msg).await {
            error!("write error: {}", e);
            break;
        }
    }
}

async fn read_loop(
    mut read: futures::stream::SplitStream<WsStream>,
    tx: mpsc::Sender<Result<Incoming>>,
) {
    while let Some(result) = read.next().await {
        let incoming = match result {
            Ok(Message::Text(text)) => {
                debug!("received: {}", truncate_for_log(text.as_str(), 1000));
                Incoming::Text(text.as_str().to_owned())
            }
            Ok(Message::Binary(data)) => Incoming::Binary(data.to_vec()),
            Ok(Message::Close(frame)) => {
                debug!("websocket closed by server: {:?}", frame);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                error!("read error: {}", e);
                if tx.send(Err(Error::WebSocket(e))).await.is_err() {
                    debug!("read error dropped, receiver gone");
                }
                break;
            }
        };
        if tx.send(Ok(incoming)).await.is_err() {
            break;
        }
    }
}

pub(crate) fn generate_event_id() -> String {
    format!("event_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// Truncates on a char boundary so multi-byte text never panics.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_event_id() {
        let id = generate_event_id();
        assert!(id.starts_with("event_"));
        assert_eq!(id.len(), 18);
        assert_ne!(id, generate_event_id());
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        assert_eq!(truncate_for_log("abc", 10), "abc");
        // Each CJK char is 3 bytes; cutting at 4 must back off to 3.
        assert_eq!(truncate_for_log("你好世界", 4), "你...");
    }
}
