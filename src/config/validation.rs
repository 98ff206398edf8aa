//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check breaker names are present and unique
//! - Validate value ranges (thresholds are percentages, durations > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::{BreakerConfig, GuardConfig, WindowType};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("breaker name must not be empty")]
    EmptyName,

    #[error("breaker '{0}' is configured more than once")]
    DuplicateName(String),

    #[error("breaker '{name}': {field} must be at least 1")]
    Zero { name: String, field: &'static str },

    #[error("breaker '{name}': minimum_calls ({minimum_calls}) exceeds window_size ({window_size})")]
    MinimumCallsExceedWindow {
        name: String,
        minimum_calls: u32,
        window_size: u32,
    },

    #[error("breaker '{name}': {field} must be within (0, 100], got {value}")]
    ThresholdOutOfRange {
        name: String,
        field: &'static str,
        value: f64,
    },

    #[error("health_check.interval_secs must be at least 1")]
    ZeroHealthInterval,
}

/// Validate the whole configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for breaker in &config.breakers {
        if !breaker.name.is_empty() && !seen.insert(breaker.name.as_str()) {
            errors.push(ValidationError::DuplicateName(breaker.name.clone()));
        }
        errors.extend(validate_breaker(breaker));
    }

    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroHealthInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one breaker row in isolation.
pub fn validate_breaker(config: &BreakerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let name = &config.name;

    if name.is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let counts = [
        ("window_size", config.window_size as u64),
        ("minimum_calls", config.minimum_calls as u64),
        ("half_open_trial_calls", config.half_open_trial_calls as u64),
        ("slow_call_duration_ms", config.slow_call_duration_ms),
        ("open_wait_duration_ms", config.open_wait_duration_ms),
    ];
    for (field, value) in counts {
        if value == 0 {
            errors.push(ValidationError::Zero {
                name: name.clone(),
                field,
            });
        }
    }

    if let Some(probe) = &config.probe {
        if probe.timeout_ms == 0 {
            errors.push(ValidationError::Zero {
                name: name.clone(),
                field: "probe.timeout_ms",
            });
        }
    }

    // A count-based window never holds more than window_size calls.
    if config.window_type == WindowType::CountBased && config.minimum_calls > config.window_size {
        errors.push(ValidationError::MinimumCallsExceedWindow {
            name: name.clone(),
            minimum_calls: config.minimum_calls,
            window_size: config.window_size,
        });
    }

    let thresholds = [
        ("failure_rate_threshold", config.failure_rate_threshold),
        ("slow_call_rate_threshold", config.slow_call_rate_threshold),
    ];
    for (field, value) in thresholds {
        if !(value > 0.0 && value <= 100.0) {
            errors.push(ValidationError::ThresholdOutOfRange {
                name: name.clone(),
                field,
                value,
            });
        }
    }

    errors
}
