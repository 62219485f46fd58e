use axum::extract::ws::Message;
use serde_json::Value;

/// A WebSocket frame, independent of the transport library.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

impl Frame {
    pub fn json(value: &Value) -> Self {
        Frame::Text(value.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Converts an axum message; pings and pongs yield `None`.
    pub fn from_ws(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(t) => Some(Frame::Text(t.to_string())),
            Message::Binary(b) => Some(Frame::Binary(b.to_vec())),
            Message::Close(_) => Some(Frame::Close),
            Message::Ping(_) | Message::Pong(_) => None,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(t) => Message::Text(t.into()),
            Frame::Binary(b) => Message::Binary(b.into()),
            Frame::Close => Message::Close(None),
        }
    }
}
