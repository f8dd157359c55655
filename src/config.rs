//! Configuration types for upload-job

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for an upload job
///
/// The retry delay is a per-job setting rather than process-global state, so
/// tests can shorten it without leaking configuration across each other.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Delay after each unsuccessful upload attempt (default: 25s)
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Timeout for a single HTTP request issued by the production transport
    /// (default: 60s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            retry_delay: default_retry_delay(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(25_000)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}
