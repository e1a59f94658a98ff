//! Client configuration types for Parley.
//!
//! `ParleyConfig` represents the `config.toml` in the data directory that
//! controls timeouts, throttling, history size and the backend location.

use serde::{Deserialize, Serialize};

use std::time::Duration;

use crate::history::MAX_HISTORY_LIMIT;

/// Top-level configuration for the Parley client.
///
/// Loaded from `~/.parley/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParleyConfig {
    /// Base URL of the chat backend.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Local inactivity threshold. Records older than this are purged.
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// Upper bound on waiting for a session validation response.
    #[serde(default = "default_validation_timeout_secs")]
    pub validation_timeout_secs: u64,

    /// Minimum spacing between activity touches.
    #[serde(default = "default_activity_throttle_secs")]
    pub activity_throttle_secs: u64,

    /// Period of the background expiry sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Sessions requested per history call (capped at 30).
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Extra attempts for transient failures while acquiring a session.
    #[serde(default = "default_acquire_max_retries")]
    pub acquire_max_retries: u32,

    /// Fixed delay between acquisition attempts.
    #[serde(default = "default_acquire_backoff_ms")]
    pub acquire_backoff_ms: u64,

    /// Per-request transport timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_inactivity_timeout_secs() -> u64 {
    300
}

fn default_validation_timeout_secs() -> u64 {
    10
}

fn default_activity_throttle_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_history_limit() -> u32 {
    MAX_HISTORY_LIMIT
}

fn default_acquire_max_retries() -> u32 {
    2
}

fn default_acquire_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            validation_timeout_secs: default_validation_timeout_secs(),
            activity_throttle_secs: default_activity_throttle_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            history_limit: default_history_limit(),
            acquire_max_retries: default_acquire_max_retries(),
            acquire_backoff_ms: default_acquire_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ParleyConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    pub fn activity_throttle(&self) -> Duration {
        Duration::from_secs(self.activity_throttle_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn acquire_backoff(&self) -> Duration {
        Duration::from_millis(self.acquire_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// History page size, never above the server ceiling.
    pub fn history_limit(&self) -> u32 {
        self.history_limit.clamp(1, MAX_HISTORY_LIMIT)
    }
}
