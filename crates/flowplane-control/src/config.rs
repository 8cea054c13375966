//! Orchestration configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::poller::PollSettings;

/// Timing and policy for lifecycle and choreography operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlConfig {
    /// Interval between state polls in milliseconds.
    #[serde(default = "ControlConfig::default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for one state transition, in seconds.
    #[serde(default = "ControlConfig::default_transition_timeout")]
    pub transition_timeout_seconds: u64,

    /// Interval between purge status polls in milliseconds.
    #[serde(default = "ControlConfig::default_drain_interval")]
    pub drain_interval_ms: u64,

    /// Maximum purge status polls.
    #[serde(default = "ControlConfig::default_drain_attempts")]
    pub drain_max_attempts: u32,

    /// Delete a connection even if its queue did not finish draining.
    #[serde(default = "ControlConfig::default_proceed_on_incomplete_drain")]
    pub proceed_on_incomplete_drain: bool,
}

impl ControlConfig {
    const fn default_poll_interval() -> u64 {
        1000
    }

    const fn default_transition_timeout() -> u64 {
        120
    }

    const fn default_drain_interval() -> u64 {
        3000
    }

    const fn default_drain_attempts() -> u32 {
        10
    }

    const fn default_proceed_on_incomplete_drain() -> bool {
        true
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `FLOWPLANE_POLL_INTERVAL_MS`
    /// - `FLOWPLANE_TRANSITION_TIMEOUT_SECONDS`
    /// - `FLOWPLANE_DRAIN_INTERVAL_MS`
    /// - `FLOWPLANE_DRAIN_MAX_ATTEMPTS`
    /// - `FLOWPLANE_PROCEED_ON_INCOMPLETE_DRAIN`
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse("FLOWPLANE_POLL_INTERVAL_MS") {
            config.poll_interval_ms = n;
        }
        if let Some(n) = env_parse("FLOWPLANE_TRANSITION_TIMEOUT_SECONDS") {
            config.transition_timeout_seconds = n;
        }
        if let Some(n) = env_parse("FLOWPLANE_DRAIN_INTERVAL_MS") {
            config.drain_interval_ms = n;
        }
        if let Some(n) = env_parse("FLOWPLANE_DRAIN_MAX_ATTEMPTS") {
            config.drain_max_attempts = n;
        }
        if let Some(b) = env_parse("FLOWPLANE_PROCEED_ON_INCOMPLETE_DRAIN") {
            config.proceed_on_incomplete_drain = b;
        }

        config
    }

    /// Polling settings for state convergence.
    #[must_use]
    pub const fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.transition_timeout_seconds),
        }
    }

    /// Interval between purge status polls.
    #[must_use]
    pub const fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::default_poll_interval(),
            transition_timeout_seconds: Self::default_transition_timeout(),
            drain_interval_ms: Self::default_drain_interval(),
            drain_max_attempts: Self::default_drain_attempts(),
            proceed_on_incomplete_drain: Self::default_proceed_on_incomplete_drain(),
        }
    }
}

fn env_parse<V: std::str::FromStr>(key: &str) -> Option<V> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ControlConfig::default();
        let poll = config.poll_settings();

        assert_eq!(poll.interval, Duration::from_secs(1));
        assert_eq!(poll.timeout, Duration::from_secs(120));
        assert_eq!(config.drain_interval(), Duration::from_secs(3));
        assert_eq!(config.drain_max_attempts, 10);
        assert!(config.proceed_on_incomplete_drain);
        assert_eq!(poll, PollSettings::default());
    }

    #[test]
    fn deserialize_with_partial_fields() {
        let config: ControlConfig =
            serde_json::from_str(r#"{"drain_max_attempts": 3, "proceed_on_incomplete_drain": false}"#)
                .unwrap();

        assert_eq!(config.drain_max_attempts, 3);
        assert!(!config.proceed_on_incomplete_drain);
        assert_eq!(config.poll_interval_ms, 1000);
    }
}
