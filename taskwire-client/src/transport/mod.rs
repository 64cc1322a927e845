//! Socket transport: the one-physical-socket layer.
//!
//! [`Connector`] is the dial seam. The real implementation speaks
//! tokio-tungstenite; tests script a [`MockConnector`] instead, the same way
//! session logic elsewhere in the codebase is tested against scripted
//! collaborators rather than a network.

mod mock;
mod ws;

pub use mock::{MockConnector, MockRemote};
pub use ws::WsConnector;

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

/// Close code reported for an abnormal, codeless termination (the WebSocket
/// "abnormal closure" status).
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Lifecycle state of one physical socket.
///
/// Exactly one terminal transition: every transport ends in `Closed` and is
/// never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// One event surfaced by a live transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Text(String),

    /// A transport-level error. Non-fatal on its own; the close that always
    /// follows drives the reconnect decision.
    Error(String),

    /// Terminal close, with the peer's close code when one was supplied.
    Closed { code: u16, reason: String },
}

/// One live socket, exclusively owned by the session driver. Never exported
/// to application code.
#[async_trait]
pub trait Transport: Send {
    /// The next lifecycle event. Returns `None` once the transport has
    /// delivered its terminal close.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Close with the given code and reason.
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}

/// Dials new transports.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError>;
}
