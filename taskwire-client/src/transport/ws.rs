//! tokio-tungstenite transport.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use super::{CLOSE_ABNORMAL, Connector, Transport, TransportEvent};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector speaking tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) = connect_async(url.as_str()).await?;
        Ok(Box::new(WsTransport {
            stream,
            closed: false,
        }))
    }
}

/// One live tokio-tungstenite socket.
struct WsTransport {
    stream: WsStream,
    closed: bool,
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(TransportEvent::Text(text.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    self.closed = true;
                    let (code, reason) = match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
                        None => (CLOSE_ABNORMAL, String::new()),
                    };
                    return Some(TransportEvent::Closed { code, reason });
                }
                Some(Ok(
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_),
                )) => {
                    // Pongs are handled by tungstenite; binary frames are not
                    // part of the protocol.
                    continue;
                }
                Some(Err(e)) => {
                    debug!(error = %e, "transport error");
                    return Some(TransportEvent::Error(e.to_string()));
                }
                None => {
                    // Stream ended without a close frame: network drop.
                    self.closed = true;
                    return Some(TransportEvent::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: String::new(),
                    });
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(TransportError::from)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.stream
            .send(Message::Close(Some(frame)))
            .await
            .map_err(TransportError::from)
    }
}
