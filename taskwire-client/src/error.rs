//! Error types for taskwire-client

use thiserror::Error;

/// Top-level error type for taskwire-client
#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to the session lifecycle
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation on a session that was never opened.
    #[error("Session has not been opened")]
    NotConnected,

    /// Operation on a session that was explicitly closed or exhausted its
    /// reconnect budget.
    #[error("Session is torn down")]
    TornDown,
}

/// Errors surfaced by the socket transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors in the supplied configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_not_connected_displays_correctly() {
        let error = SessionError::NotConnected;
        assert!(error.to_string().contains("not been opened"));
    }

    #[test]
    fn session_error_torn_down_displays_correctly() {
        let error = SessionError::TornDown;
        assert!(error.to_string().contains("torn down"));
    }

    #[test]
    fn transport_error_connect_displays_correctly() {
        let error = TransportError::Connect("connection refused".to_string());
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn live_error_converts_from_session_error() {
        let error: LiveError = SessionError::TornDown.into();
        assert!(matches!(error, LiveError::Session(_)));
        assert!(error.to_string().contains("Session error"));
    }

    #[test]
    fn live_error_converts_from_config_error() {
        let error: LiveError = ConfigError::InvalidEndpoint("nope".to_string()).into();
        assert!(matches!(error, LiveError::Config(_)));
    }

    #[test]
    fn transport_error_converts_from_serde_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: TransportError = json_error.into();
        assert!(matches!(error, TransportError::Encode(_)));
    }
}
