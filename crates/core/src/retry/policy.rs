//! Retry policy

use std::time::Duration;

use courier_domain::RetryConfig;

/// Limits and delays applied by the retry coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum replays per individual request. The bound is exclusive: a
    /// request is replayed while its attempt count is below this value.
    pub max_retries: u32,

    /// Amount added to the shared replay delay after each successful refresh
    /// cycle.
    pub delay_increment: Duration,

    /// Clamp for the cumulative replay delay. The delay grows across cycles
    /// but never past this value.
    pub max_replay_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_increment: Duration::from_secs(1),
            max_replay_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Build from the retry section of the SDK configuration.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay_increment: Duration::from_millis(config.delay_increment_ms),
            max_replay_delay: Duration::from_millis(config.max_replay_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_limits() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_increment, Duration::from_secs(1));
        assert_eq!(policy.max_replay_delay, Duration::from_secs(30));
    }

    #[test]
    fn from_config_converts_milliseconds() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_retries: 5,
            delay_increment_ms: 250,
            max_replay_delay_ms: 2_000,
        });
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay_increment, Duration::from_millis(250));
        assert_eq!(policy.max_replay_delay, Duration::from_secs(2));
    }
}
