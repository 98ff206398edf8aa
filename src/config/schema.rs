//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin HTTP surface settings.
    pub admin: AdminConfig,

    /// Periodic health aggregation settings.
    pub health_check: HealthCheckConfig,

    /// One row per protected dependency.
    pub breakers: Vec<BreakerConfig>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            health_check: HealthCheckConfig::default(),
            breakers: default_breakers(),
        }
    }
}

/// The stock dependency table: a cheap cache, a search index and an object store.
///
/// The cache trips early and recovers quickly; storage tolerates more before
/// tripping, waits longest, and has no fallback path.
///
/// No row probes by default because the addresses are deployment-specific.
/// A cache liveness probe is one extra table on its row:
///
/// ```toml
/// [[breakers]]
/// name = "cache"
/// window_size = 10
/// minimum_calls = 5
///
/// [breakers.probe]
/// address = "127.0.0.1:6379"
/// timeout_ms = 250
/// ```
pub fn default_breakers() -> Vec<BreakerConfig> {
    vec![
        BreakerConfig::new("cache")
            .with_window_size(10)
            .with_minimum_calls(5)
            .with_failure_rate_threshold(50.0)
            .with_slow_call_rate_threshold(80.0)
            .with_slow_call_duration(Duration::from_millis(200))
            .with_open_wait_duration(Duration::from_secs(10))
            .with_half_open_trial_calls(3),
        BreakerConfig::new("search")
            .with_window_size(20)
            .with_minimum_calls(10)
            .with_failure_rate_threshold(60.0)
            .with_slow_call_rate_threshold(80.0)
            .with_slow_call_duration(Duration::from_secs(2))
            .with_open_wait_duration(Duration::from_secs(30))
            .with_half_open_trial_calls(5),
        BreakerConfig::new("storage")
            .with_window_size(20)
            .with_minimum_calls(10)
            .with_failure_rate_threshold(70.0)
            .with_slow_call_rate_threshold(90.0)
            .with_slow_call_duration(Duration::from_secs(5))
            .with_open_wait_duration(Duration::from_secs(60))
            .with_half_open_trial_calls(3)
            .with_critical(true),
    ]
}

/// How the sliding window bounds its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    /// The last `window_size` calls.
    #[default]
    CountBased,
    /// The calls of the last `window_size` seconds.
    TimeBased,
}

/// Circuit breaker settings for one dependency.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// Dependency identifier, used as the registry key.
    pub name: String,

    /// A critical dependency has no fallback; when it is down so is the system.
    #[serde(default)]
    pub critical: bool,

    #[serde(default)]
    pub window_type: WindowType,

    /// Calls (count-based) or seconds (time-based) kept in the window.
    #[serde(default = "default_window_size")]
    pub window_size: u32,

    /// Calls required in the window before rates are evaluated.
    #[serde(default = "default_minimum_calls")]
    pub minimum_calls: u32,

    /// Failure rate, in percent, at or above which the circuit opens.
    #[serde(default = "default_rate_threshold")]
    pub failure_rate_threshold: f64,

    /// Slow-call rate, in percent, at or above which the circuit opens.
    #[serde(default = "default_slow_rate_threshold")]
    pub slow_call_rate_threshold: f64,

    /// Calls taking at least this long are slow.
    #[serde(default = "default_slow_call_duration_ms")]
    pub slow_call_duration_ms: u64,

    /// Time the circuit stays open before a trial call is allowed.
    #[serde(default = "default_open_wait_duration_ms")]
    pub open_wait_duration_ms: u64,

    /// Calls permitted while half-open before the breaker re-decides.
    #[serde(default = "default_half_open_trial_calls")]
    pub half_open_trial_calls: u32,

    /// Without it an open circuit stays open until forced closed.
    #[serde(default = "default_true")]
    pub auto_transition_to_half_open: bool,

    /// Optional liveness probe run by the health aggregator.
    #[serde(default)]
    pub probe: Option<ProbeConfig>,
}

fn default_window_size() -> u32 {
    10
}

fn default_minimum_calls() -> u32 {
    5
}

fn default_rate_threshold() -> f64 {
    50.0
}

fn default_slow_rate_threshold() -> f64 {
    100.0
}

fn default_slow_call_duration_ms() -> u64 {
    1_000
}

fn default_open_wait_duration_ms() -> u64 {
    30_000
}

fn default_half_open_trial_calls() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl BreakerConfig {
    /// Create a configuration with default tuning for the named dependency.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            critical: false,
            window_type: WindowType::default(),
            window_size: default_window_size(),
            minimum_calls: default_minimum_calls(),
            failure_rate_threshold: default_rate_threshold(),
            slow_call_rate_threshold: default_slow_rate_threshold(),
            slow_call_duration_ms: default_slow_call_duration_ms(),
            open_wait_duration_ms: default_open_wait_duration_ms(),
            half_open_trial_calls: default_half_open_trial_calls(),
            auto_transition_to_half_open: true,
            probe: None,
        }
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_window_type(mut self, window_type: WindowType) -> Self {
        self.window_type = window_type;
        self
    }

    pub fn with_window_size(mut self, size: u32) -> Self {
        self.window_size = size;
        self
    }

    pub fn with_minimum_calls(mut self, calls: u32) -> Self {
        self.minimum_calls = calls;
        self
    }

    pub fn with_failure_rate_threshold(mut self, percent: f64) -> Self {
        self.failure_rate_threshold = percent;
        self
    }

    pub fn with_slow_call_rate_threshold(mut self, percent: f64) -> Self {
        self.slow_call_rate_threshold = percent;
        self
    }

    pub fn with_slow_call_duration(mut self, duration: Duration) -> Self {
        self.slow_call_duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_open_wait_duration(mut self, duration: Duration) -> Self {
        self.open_wait_duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_half_open_trial_calls(mut self, calls: u32) -> Self {
        self.half_open_trial_calls = calls;
        self
    }

    pub fn with_auto_transition_to_half_open(mut self, enabled: bool) -> Self {
        self.auto_transition_to_half_open = enabled;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn slow_call_duration(&self) -> Duration {
        Duration::from_millis(self.slow_call_duration_ms)
    }

    pub fn open_wait_duration(&self) -> Duration {
        Duration::from_millis(self.open_wait_duration_ms)
    }
}

/// TCP liveness probe for a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Address to connect to (e.g., "127.0.0.1:6379").
    pub address: String,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_probe_timeout_ms() -> u64 {
    500
}

/// Health aggregation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Run the periodic health monitor.
    pub enabled: bool,

    /// Aggregation interval in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the health and breaker endpoints.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_has_distinct_tuning() {
        let breakers = default_breakers();
        let names: Vec<_> = breakers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["cache", "search", "storage"]);

        let cache = &breakers[0];
        let storage = &breakers[2];
        assert!(cache.window_size < storage.window_size);
        assert!(cache.failure_rate_threshold < storage.failure_rate_threshold);
        assert!(cache.open_wait_duration() < storage.open_wait_duration());
        assert!(storage.critical);
        assert!(!cache.critical);
    }

    #[test]
    fn test_breaker_row_defaults_from_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [[breakers]]
            name = "search"
            window_size = 5
            minimum_calls = 3
            failure_rate_threshold = 40.0
            slow_call_duration_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.breakers.len(), 1);
        let row = &config.breakers[0];
        assert_eq!(row.window_type, WindowType::CountBased);
        assert_eq!(row.slow_call_duration(), Duration::from_millis(500));
        assert_eq!(row.half_open_trial_calls, 3);
        assert!(row.auto_transition_to_half_open);
        assert!(!row.critical);
        assert!(config.admin.enabled);
    }

    #[test]
    fn test_time_based_window_and_probe() {
        let config: GuardConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"

            [[breakers]]
            name = "cache"
            window_type = "time_based"
            window_size = 30

            [breakers.probe]
            address = "127.0.0.1:6379"
            "#,
        )
        .unwrap();

        assert_eq!(config.observability.log_format, LogFormat::Json);
        let row = &config.breakers[0];
        assert_eq!(row.window_type, WindowType::TimeBased);
        let probe = row.probe.as_ref().unwrap();
        assert_eq!(probe.address, "127.0.0.1:6379");
        assert_eq!(probe.timeout_ms, 500);
    }
}
