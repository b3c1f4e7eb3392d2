// Runtime configuration loaded from environment variables
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS};

/// Settings shared by every widget spawned in one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL widget queries are resolved against, e.g. http://localhost:5000/api/widgets
    pub api_base_url: String,
    /// Transport timeout for a single fetch
    pub request_timeout_ms: u64,
    /// First retry delay after a failure
    pub backoff_base_ms: u64,
    /// Ceiling for the retry delay
    pub backoff_max_ms: u64,
    /// Period of the retry countdown shown to the UI
    pub countdown_tick_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: std::env::var("PULSEBOARD_API_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "http://localhost:5000/api/widgets".to_string()),
            request_timeout_ms: env_u64("PULSEBOARD_REQUEST_TIMEOUT_MS").unwrap_or(30_000),
            backoff_base_ms: env_u64("PULSEBOARD_BACKOFF_BASE_MS")
                .unwrap_or(DEFAULT_BASE_DELAY_MS),
            backoff_max_ms: env_u64("PULSEBOARD_BACKOFF_MAX_MS").unwrap_or(DEFAULT_MAX_DELAY_MS),
            countdown_tick_ms: 1_000,
            user_agent: "pulseboard/0.1".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms.max(1))
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}
