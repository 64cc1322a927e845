//! Outbound client-to-server messages.

use serde::{Deserialize, Serialize};

/// Messages sent from the client on chat-style channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A chat message, optionally referencing an uploaded file.
    ChatMessage {
        message: String,
        #[serde(default)]
        file: Option<String>,
    },

    /// Typing indicator for the current channel.
    Typing { is_typing: bool },
}
