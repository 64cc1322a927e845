//! Linear-backoff reconnection policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum number of reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base delay between reconnect attempts.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(3000);

/// Linear backoff configuration for reconnection.
///
/// The delay before attempt *n* (1-indexed) is `base_delay * n`. Reconnects
/// here serve a client picking its live feed back up, not a high-throughput
/// retry storm, so the growth is deliberately linear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectConfig {
    /// Maximum number of attempts before the session becomes terminal.
    pub max_attempts: u32,
    /// Base delay unit; attempt *n* waits `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl ReconnectConfig {
    /// The delay before the given attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Whether the given attempt (1-indexed) is still within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}
