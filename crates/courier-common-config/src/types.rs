//! Configuration types.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Retry behaviour shared by every dispatch.
    pub retry: RetrySettings,
    /// HTTP transport settings.
    pub http: HttpSettings,
    /// Background runtime settings.
    pub runtime: RuntimeSettings,
}

/// Delay curve between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Retry straight away.
    Immediate,
    /// Wait `initial_delay_ms` every time.
    Fixed,
    /// Multiply the delay by `multiplier` after each attempt, capped at `max_delay_ms`.
    Exponential,
}

/// Retry policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of transport calls per dispatch, first call included.
    pub max_attempts: u32,
    /// Delay curve.
    pub backoff: BackoffKind,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Growth factor for exponential backoff.
    pub multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            initial_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// User agent override.
    pub user_agent: Option<String>,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Accept gzip-encoded responses.
    pub gzip: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: None,
            pool_max_idle_per_host: 10,
            gzip: true,
        }
    }
}

/// Background runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Worker threads for the I/O pool (0 = one per core).
    pub worker_threads: usize,
    /// Thread name prefix.
    pub thread_name: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name: "courier-io".to_string(),
        }
    }
}
