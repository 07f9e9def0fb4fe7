//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, probabilities in [0, 1])
//! - Detect contradictory settings (slow band overlapping failure band)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let rate = &config.rate_limit;
    if rate.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if rate.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }

    let faults = &config.fault_injection;
    for (field, value) in [
        ("fault_injection.slow_probability", faults.slow_probability),
        ("fault_injection.failure_threshold", faults.failure_threshold),
        ("fault_injection.unavailable_ratio", faults.unavailable_ratio),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::new(field, format!("{value} is outside [0, 1]")));
        }
    }
    if faults.slow_probability > faults.failure_threshold {
        errors.push(ValidationError::new(
            "fault_injection.slow_probability",
            "must not exceed failure_threshold",
        ));
    }
    if faults.slow_min_ms > faults.slow_max_ms {
        errors.push(ValidationError::new(
            "fault_injection.slow_min_ms",
            "must not exceed slow_max_ms",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.rate_limit.window_ms = 0;
        config.rate_limit.max_requests = 0;
        config.fault_injection.slow_probability = 0.9;
        config.fault_injection.failure_threshold = 0.5;
        config.fault_injection.unavailable_ratio = 1.5;
        config.fault_injection.slow_min_ms = 3000;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "rate_limit.window_ms",
                "rate_limit.max_requests",
                "fault_injection.unavailable_ratio",
                "fault_injection.slow_probability",
                "fault_injection.slow_min_ms",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());
        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
