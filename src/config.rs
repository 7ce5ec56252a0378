use crate::error::{ReconcileError, Result};
use std::time::Duration;

/// How much a gateway-provided success hint on the redirect is trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintPolicy {
    /// A `capture`/`settlement` hint alone is enough to render success.
    #[default]
    Trust,
    /// Success is only rendered once the local record reads PAID.
    RequireLocalConfirmation,
}

/// Polling cadence while a payment is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Upper bound for a single sync + lookup round trip.
    pub tick_timeout: Duration,
}

impl PollPolicy {
    /// Shortest interval the polling loop runs with.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(interval: Duration, max_attempts: u32, tick_timeout: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(ReconcileError::ValidationError(
                "Poll interval must be positive".to_string(),
            ));
        }
        Ok(Self {
            interval,
            max_attempts,
            tick_timeout,
        })
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 40,
            tick_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileConfig {
    pub poll: PollPolicy,
    pub hint_policy: HintPolicy,
}

/// Connection settings for the Midtrans-style gateway status API.
#[derive(Clone)]
pub struct MidtransConfig {
    pub base_url: String,
    pub server_key: String,
    pub timeout_ms: u64,
}

impl MidtransConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("MIDTRANS_BASE_URL")
                .unwrap_or_else(|_| "https://api.sandbox.midtrans.com".to_string()),
            server_key: std::env::var("MIDTRANS_SERVER_KEY").unwrap_or_default(),
            timeout_ms: std::env::var("GATEWAY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(2500),
        }
    }
}

impl std::fmt::Debug for MidtransConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidtransConfig")
            .field("base_url", &self.base_url)
            .field("server_key", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_policy_rejects_zero_interval() {
        let result = PollPolicy::new(Duration::ZERO, 40, Duration::from_secs(10));
        assert!(matches!(result, Err(ReconcileError::ValidationError(_))));

        let policy = PollPolicy::new(Duration::from_millis(250), 4, Duration::from_secs(1)).unwrap();
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, 4);
    }

    #[test]
    fn test_midtrans_config_debug_redacts_key() {
        let config = MidtransConfig {
            base_url: "https://api.sandbox.midtrans.com".to_string(),
            server_key: "SB-Mid-server-secret".to_string(),
            timeout_ms: 2500,
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("SB-Mid-server-secret"));
    }
}
