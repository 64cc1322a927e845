//! Client configuration.
//!
//! The host application owns configuration sources (files, environment) and
//! hands this crate a populated [`LiveConfig`]; the derives are here so hosts
//! can embed it directly in their own config files.

use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectConfig;

/// Default query-parameter key the bearer token is sent under.
pub const DEFAULT_TOKEN_KEY: &str = "token";

/// The origin the endpoint is derived from when no explicit base is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Origin {
    /// Host (and optional port), e.g. `app.example.com` or `localhost:8000`.
    pub host: String,
    /// Whether the origin is secure; selects `wss` over `ws`.
    pub secure: bool,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            secure: false,
        }
    }
}

/// Configuration for a live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Explicit WebSocket base endpoint, e.g. `wss://api.example.com/ws`.
    /// When unset, the endpoint is derived from `origin`.
    pub endpoint: Option<String>,

    /// Origin used to derive the endpoint when none is configured.
    #[serde(default)]
    pub origin: Origin,

    /// Query-parameter key the bearer token is attached under.
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Reconnection policy after abnormal closes.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_token_key() -> String {
    DEFAULT_TOKEN_KEY.to_string()
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            origin: Origin::default(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl LiveConfig {
    /// Config deriving its endpoint from the given origin.
    pub fn for_origin(host: impl Into<String>, secure: bool) -> Self {
        Self {
            origin: Origin {
                host: host.into(),
                secure,
            },
            ..Self::default()
        }
    }

    /// Config using an explicit base endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }
}
