//! Credential-store seam.
//!
//! The platform's auth layer owns token storage and refresh. The session only
//! ever reads the current token, immediately before each connect attempt, so
//! a token refreshed between attempts is picked up on reconnect.

use std::sync::RwLock;

/// Read access to the current bearer token.
pub trait TokenProvider: Send + Sync {
    /// The current token, if any.
    ///
    /// Absence is not an error: the URL is built without a token parameter
    /// and the server rejects unauthenticated channels on its side.
    fn current_token(&self) -> Option<String>;
}

/// In-memory token store, for apps that keep the token in process memory and
/// for tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Store with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Replace (or clear) the stored token.
    pub fn set(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }
}

impl TokenProvider for MemoryTokenStore {
    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
