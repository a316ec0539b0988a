//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gate::GatePolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KeygateConfig {
    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Named gates, one table per gate (`[gates.<name>]`).
    pub gates: BTreeMap<String, GateConfig>,
}

/// Settings for one named gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Charged attempts admitted per key before the key opens.
    pub failure_threshold: i64,

    /// Window length in milliseconds. Accepted for compatibility; unused.
    pub interval_ms: u64,

    /// Time in milliseconds a key stays open after its first rejection.
    pub cooldown_ms: u64,

    /// Lock shards. `None` builds a single-lock gate.
    pub shards: Option<usize>,
}

impl GateConfig {
    pub fn policy(&self) -> GatePolicy {
        GatePolicy::new(
            self.failure_threshold,
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.cooldown_ms),
        )
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            interval_ms: 20_000,
            cooldown_ms: 3_000,
            shards: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
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

    /// Pretty for terminals, JSON for log shipping.
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
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_scenario() {
        let gate = GateConfig::default();
        let policy = gate.policy();
        assert_eq!(policy.failure_threshold, 5);
        assert_eq!(policy.interval, Duration::from_secs(20));
        assert_eq!(policy.cooldown, Duration::from_secs(3));
        assert!(gate.shards.is_none());
    }

    #[test]
    fn test_partial_gate_table_uses_defaults() {
        let config: KeygateConfig = toml::from_str(
            r#"
            [gates.search]
            failure_threshold = 12
            "#,
        )
        .unwrap();

        let search = &config.gates["search"];
        assert_eq!(search.failure_threshold, 12);
        assert_eq!(search.cooldown_ms, 3_000);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_is_lowercase() {
        let config: KeygateConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
