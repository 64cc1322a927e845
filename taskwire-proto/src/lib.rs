//! Wire protocol for the taskwire live-update channel.
//!
//! The client library and its test harnesses both depend on these types so
//! the wire format is defined in exactly one place.

mod envelope;
mod message;
mod task;

pub use envelope::{Envelope, FALLBACK_KIND};
pub use message::ClientMessage;
pub use task::{Task, TaskEvent};

/// Close code reserved for deliberate teardown.
///
/// A transport closed with this code must never be reconnected; any other
/// code hands control to the reconnection policy.
pub const CLOSE_NORMAL: u16 = 1000;
