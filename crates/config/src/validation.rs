//! Configuration validation

use crate::{ConfigError, Result, SubmitterConfig};
use std::time::Duration;
use tx_submitter_ratelimit::BackoffPolicy;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire submitter configuration, reporting every problem at once
pub fn validate_config(config: &SubmitterConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Validate network config
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    if config.network.passphrase().trim().is_empty() {
        errors.push(ValidationError::new(
            "network.network_passphrase",
            "network passphrase cannot be empty",
        ));
    }

    // Validate gateway config
    if config.gateway.requests_per_second == 0 {
        errors.push(ValidationError::new(
            "gateway.requests_per_second",
            "must be greater than 0",
        ));
    }

    if config.gateway.burst == 0 {
        errors.push(ValidationError::new("gateway.burst", "must be greater than 0"));
    }

    // Validate submission config
    if config.submission.max_attempts == 0 {
        errors.push(ValidationError::new(
            "submission.max_attempts",
            "must be greater than 0",
        ));
    }

    if config.submission.envelope_validity_secs == 0 {
        errors.push(ValidationError::new(
            "submission.envelope_validity_secs",
            "must be greater than 0",
        ));
    }

    errors.extend(validate_backoff(&config.submission.backoff));

    // a delay longer than the validity window could never be waited out
    let validity = Duration::from_secs(config.submission.envelope_validity_secs);
    if config.submission.backoff.max_delay() > validity {
        errors.push(ValidationError::new(
            "submission.backoff.max_ms",
            "must not exceed envelope_validity_secs",
        ));
    }

    // Validate polling config
    if config.polling.interval_ms == 0 {
        errors.push(ValidationError::new(
            "polling.interval_ms",
            "must be greater than 0",
        ));
    }

    if config.polling.max_poll_duration_secs == 0 {
        errors.push(ValidationError::new(
            "polling.max_poll_duration_secs",
            "must be greater than 0",
        ));
    }

    // Return all errors if any were found
    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

fn validate_backoff(policy: &BackoffPolicy) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    match *policy {
        BackoffPolicy::Linear {
            initial_ms, max_ms, ..
        } => {
            if initial_ms > max_ms {
                errors.push(ValidationError::new(
                    "submission.backoff.initial_ms",
                    "must not exceed max_ms",
                ));
            }
        }
        BackoffPolicy::Exponential {
            initial_ms,
            max_ms,
            multiplier,
        } => {
            if initial_ms == 0 {
                errors.push(ValidationError::new(
                    "submission.backoff.initial_ms",
                    "must be greater than 0 for exponential backoff",
                ));
            }
            if initial_ms > max_ms {
                errors.push(ValidationError::new(
                    "submission.backoff.initial_ms",
                    "must not exceed max_ms",
                ));
            }
            if !(multiplier >= 1.0) {
                errors.push(ValidationError::new(
                    "submission.backoff.multiplier",
                    "must be at least 1.0",
                ));
            }
        }
    }
    errors
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
