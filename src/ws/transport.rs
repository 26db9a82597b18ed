//! Transport seam: a full-duplex message socket keyed by URL.
//!
//! `TungsteniteTransport` is the production implementation; tests script
//! their own `Transport` to drive connections under a paused clock.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::ws::CLOSE_NORMAL;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One frame on the socket, independent of the underlying library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// `code` is `None` when the peer sent a close without a frame.
    Close { code: Option<u16>, reason: String },
}

impl Frame {
    /// Normal-closure frame (1000).
    pub fn close_normal(reason: impl Into<String>) -> Self {
        Frame::Close {
            code: Some(CLOSE_NORMAL),
            reason: reason.into(),
        }
    }
}

/// An open socket.
#[async_trait]
pub trait Socket: Send {
    /// Next inbound frame; `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<Frame, WsError>>;

    async fn send(&mut self, frame: Frame) -> Result<(), WsError>;
}

/// Opens sockets.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, WsError>;
}

// ─── tokio-tungstenite ───────────────────────────────────────────────────────

/// Native transport using `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Socket>, WsError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        Ok(Box::new(TungsteniteSocket { stream }))
    }
}

struct TungsteniteSocket {
    stream: WsStream,
}

#[async_trait]
impl Socket for TungsteniteSocket {
    async fn recv(&mut self) -> Option<Result<Frame, WsError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => {
                    return Some(Err(WsError::Closed {
                        code: None,
                        reason: e.to_string(),
                    }))
                }
            };
            if let Some(frame) = from_message(msg) {
                return Some(Ok(frame));
            }
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<(), WsError> {
        self.stream
            .send(to_message(frame))
            .await
            .map_err(|e| WsError::SendFailed(e.to_string()))
    }
}

/// Raw `Message::Frame` values never surface while reading.
fn from_message(msg: Message) -> Option<Frame> {
    match msg {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
        Message::Ping(data) => Some(Frame::Ping(data.to_vec())),
        Message::Pong(data) => Some(Frame::Pong(data.to_vec())),
        Message::Close(frame) => Some(extract_close(frame.as_ref())),
        Message::Frame(_) => None,
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data.into()),
        Frame::Ping(data) => Message::Ping(data.into()),
        Frame::Pong(data) => Message::Pong(data.into()),
        Frame::Close { code, reason } => Message::Close(code.map(|code| CloseFrame {
            code: CloseCode::from(code),
            reason: reason.into(),
        })),
    }
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> Frame {
    match frame {
        Some(f) => Frame::Close {
            code: Some(f.code.into()),
            reason: f.reason.as_str().to_owned(),
        },
        None => Frame::Close {
            code: None,
            reason: "No close frame".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_close_with_frame() {
        let frame = CloseFrame {
            code: CloseCode::Away,
            reason: "goodbye".into(),
        };
        assert_eq!(
            extract_close(Some(&frame)),
            Frame::Close {
                code: Some(1001),
                reason: "goodbye".into()
            }
        );
    }

    #[test]
    fn test_extract_close_no_frame() {
        assert_eq!(
            extract_close(None),
            Frame::Close {
                code: None,
                reason: "No close frame".into()
            }
        );
    }

    #[test]
    fn test_message_conversion() {
        let msg = to_message(Frame::close_normal("Client disconnect"));
        match msg {
            Message::Close(Some(f)) => {
                assert_eq!(u16::from(f.code), 1000);
                assert_eq!(f.reason.as_str(), "Client disconnect");
            }
            other => panic!("unexpected message: {other:?}"),
        }

        assert_eq!(
            from_message(Message::Text("{}".into())),
            Some(Frame::Text("{}".into()))
        );
        assert_eq!(
            from_message(Message::Ping(vec![1u8, 2].into())),
            Some(Frame::Ping(vec![1, 2]))
        );
    }
}
