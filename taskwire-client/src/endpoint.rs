//! Connection URL resolution.
//!
//! One resolver serves every channel; the fixed client-notification channel
//! and per-task chat channels differ only in the suffix they pass in.

use url::Url;

use crate::config::LiveConfig;
use crate::error::ConfigError;

/// Suffix for the fixed client-notification channel.
pub const CLIENT_CHANNEL: &str = "/client/";

/// Suffix for the chat channel of one task.
pub fn task_channel(task_id: i64) -> String {
    format!("/tasks/{task_id}/")
}

/// Resolve the WebSocket URL for a channel suffix.
///
/// With an explicit base endpoint configured, the suffix is appended to the
/// base (trailing slashes trimmed). Otherwise the endpoint is derived from
/// the configured origin as `<ws|wss>://<host>/ws<suffix>`. The bearer token,
/// when present, is attached as a query parameter; its absence is not an
/// error — the server rejects unauthenticated channels.
pub fn resolve(config: &LiveConfig, suffix: &str, token: Option<&str>) -> Result<Url, ConfigError> {
    let raw = match &config.endpoint {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), suffix),
        None => {
            let scheme = if config.origin.secure { "wss" } else { "ws" };
            format!("{}://{}/ws{}", scheme, config.origin.host, suffix)
        }
    };

    let mut url =
        Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint(format!("{raw}: {e}")))?;
    if let Some(token) = token {
        url.query_pairs_mut().append_pair(&config.token_key, token);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_insecure_origin_url() {
        let config = LiveConfig::for_origin("localhost:8000", false);
        let url = resolve(&config, CLIENT_CHANNEL, None).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/client/");
    }

    #[test]
    fn derives_secure_origin_url() {
        let config = LiveConfig::for_origin("app.example.com", true);
        let url = resolve(&config, CLIENT_CHANNEL, None).unwrap();
        assert_eq!(url.as_str(), "wss://app.example.com/ws/client/");
    }

    #[test]
    fn explicit_base_is_concatenated_with_suffix() {
        let config = LiveConfig::with_endpoint("wss://api.example.com/ws");
        let url = resolve(&config, CLIENT_CHANNEL, None).unwrap();
        assert_eq!(url.as_str(), "wss://api.example.com/ws/client/");
    }

    #[test]
    fn explicit_base_trailing_slashes_are_trimmed() {
        let config = LiveConfig::with_endpoint("ws://127.0.0.1:9000//");
        let url = resolve(&config, CLIENT_CHANNEL, None).unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/client/");
    }

    #[test]
    fn token_is_attached_under_configured_key() {
        let config = LiveConfig::for_origin("localhost:8000", false);
        let url = resolve(&config, CLIENT_CHANNEL, Some("abc123")).unwrap();
        assert_eq!(url.query(), Some("token=abc123"));

        let mut custom = config.clone();
        custom.token_key = "access_token".to_string();
        let url = resolve(&custom, CLIENT_CHANNEL, Some("abc123")).unwrap();
        assert_eq!(url.query(), Some("access_token=abc123"));
    }

    #[test]
    fn missing_token_yields_no_query_parameter() {
        let config = LiveConfig::for_origin("localhost:8000", false);
        let url = resolve(&config, CLIENT_CHANNEL, None).unwrap();
        assert!(url.query().is_none());
    }

    #[test]
    fn task_channel_is_parameterized_by_id() {
        let config = LiveConfig::for_origin("localhost:8000", false);
        let url = resolve(&config, &task_channel(42), Some("t")).unwrap();
        assert_eq!(url.path(), "/ws/tasks/42/");
    }

    #[test]
    fn invalid_base_is_a_config_error() {
        let config = LiveConfig::with_endpoint("not a url");
        let result = resolve(&config, CLIENT_CHANNEL, None);
        assert!(matches!(result, Err(ConfigError::InvalidEndpoint(_))));
    }
}
