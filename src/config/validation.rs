//! Configuration validation.
//!
//! # Responsibilities
//! - Reject gate settings that would produce degenerate gates
//! - Check observability values that serde cannot type-check
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Gates themselves accept any arguments; this is the construction site
//!   where bad values get caught

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::KeygateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_SHARDS: usize = 1024;

/// A single semantic problem in a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("gate name must not be empty")]
    EmptyGateName,

    #[error("gate '{gate}': failure_threshold must be positive, got {value}")]
    NonPositiveThreshold { gate: String, value: i64 },

    #[error("gate '{gate}': shards must be a power of two between 2 and 1024, got {value}")]
    InvalidShardCount { gate: String, value: usize },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &KeygateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, gate) in &config.gates {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyGateName);
        }
        if gate.failure_threshold <= 0 {
            errors.push(ValidationError::NonPositiveThreshold {
                gate: name.clone(),
                value: gate.failure_threshold,
            });
        }
        if let Some(shards) = gate.shards {
            if !(2..=MAX_SHARDS).contains(&shards) || !shards.is_power_of_two() {
                errors.push(ValidationError::InvalidShardCount {
                    gate: name.clone(),
                    value: shards,
                });
            }
        }
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
