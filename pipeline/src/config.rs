//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Operating mode for the notification dispatcher.
///
/// In `Development` the dispatcher short-circuits every channel to an
/// always-succeed no-op so that local runs and tests never make live
/// external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Production,
    #[default]
    Development,
}

/// Bounded-retry policy for outbound notification attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so `max_retries + 1` total attempts.
    pub max_retries: u32,
    /// Base backoff in milliseconds; the wait before retry N is
    /// `delay_ms * N` (linear in the attempt number).
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the initial one.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Configuration for the notification dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Messaging-provider endpoint for templated contact messages.
    pub alert_endpoint: String,
    /// Bearer token for the messaging provider.
    pub alert_api_token: String,
    pub retry: RetryPolicy,
    /// Per-attempt request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            alert_endpoint: "https://graph.facebook.com/v18.0/messages".to_string(),
            alert_api_token: String::new(),
            retry: RetryPolicy::default(),
            request_timeout_secs: 10,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub mode: OperatingMode,
    pub dispatcher: DispatcherConfig,
}
