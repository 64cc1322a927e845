//! Persistent real-time client for the taskwire backend.
//!
//! One [`LiveSession`] represents the logical desire to stay connected to a
//! channel. It owns at most one physical socket at a time, reconnects with
//! bounded linear backoff after abnormal closes, and fans incoming events out
//! to subscribers through a two-namespace [`Dispatcher`]:
//!
//! - the **task namespace** receives `task_created`/`task_updated` pushes as
//!   typed [`Task`] records;
//! - the **generic namespace** receives everything else, keyed by the wire
//!   discriminant.
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskwire_client::endpoint::CLIENT_CHANNEL;
//! use taskwire_client::{LiveConfig, LiveSession, MemoryTokenStore, TaskEvent};
//!
//! # fn main() -> Result<(), taskwire_client::LiveError> {
//! let tokens = Arc::new(MemoryTokenStore::with_token("bearer-token"));
//! let session = LiveSession::new(LiveConfig::default(), CLIENT_CHANNEL, tokens);
//! session.subscribe_task(TaskEvent::Created, |task| {
//!     println!("new task: {}", task.id);
//! });
//! session.connect()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use auth::{MemoryTokenStore, TokenProvider};
pub use config::{LiveConfig, Origin};
pub use dispatch::{Dispatcher, SubscriptionHandle};
pub use error::{ConfigError, LiveError, SessionError, TransportError};
pub use reconnect::ReconnectConfig;
pub use session::{CONNECTION_LOST, LiveSession};
pub use taskwire_proto::{ClientMessage, Envelope, Task, TaskEvent};
pub use transport::{Connector, Transport, TransportEvent, TransportState, WsConnector};
