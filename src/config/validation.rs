//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (probabilities, delays, status codes)
//! - Check that names parse (methods, header, upstream URL)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ChaosConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderName, Method};

use crate::config::schema::ChaosConfig;

/// Upper bound for an injected delay (5 minutes).
pub const MAX_DELAY_MS: u64 = 300_000;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every violation.
pub fn validate_config(config: &ChaosConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_probability(&mut errors, "probability", config.probability);
    check_probability(&mut errors, "latency.probability", config.latency.probability);
    check_probability(&mut errors, "error.probability", config.error.probability);

    if config.latency.min_ms > config.latency.max_ms {
        errors.push(ValidationError::new(
            "latency.min_ms",
            format!(
                "must not exceed latency.max_ms ({} > {})",
                config.latency.min_ms, config.latency.max_ms
            ),
        ));
    }
    if config.latency.max_ms > MAX_DELAY_MS {
        errors.push(ValidationError::new(
            "latency.max_ms",
            format!("must be at most {} ms", MAX_DELAY_MS),
        ));
    }

    if config.error.enabled && config.error.status_codes.is_empty() {
        errors.push(ValidationError::new(
            "error.status_codes",
            "must not be empty when error injection is enabled",
        ));
    }
    for code in &config.error.status_codes {
        if !(400..=599).contains(code) {
            errors.push(ValidationError::new(
                "error.status_codes",
                format!("{} is not a 4xx or 5xx status", code),
            ));
        }
    }

    for method in &config.methods {
        if method.trim().is_empty() || Method::from_str(&method.to_uppercase()).is_err() {
            errors.push(ValidationError::new(
                "methods",
                format!("'{}' is not a valid HTTP method", method),
            ));
        }
    }

    for path in &config.exclude_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "exclude_paths",
                format!("'{}' must start with '/'", path),
            ));
        }
    }

    if let Some(header) = &config.bypass_header {
        if HeaderName::from_str(header).is_err() {
            errors.push(ValidationError::new(
                "bypass_header",
                format!("'{}' is not a valid header name", header),
            ));
        }
    }

    if let Some(upstream) = &config.server.upstream {
        match url::Url::parse(upstream) {
            Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
            Ok(_) => errors.push(ValidationError::new(
                "server.upstream",
                format!("'{}' must be an absolute http:// URL", upstream),
            )),
            Err(e) => errors.push(ValidationError::new(
                "server.upstream",
                format!("'{}' is not a valid URL: {}", upstream, e),
            )),
        }
    }

    let timeout_ms = config.server.request_timeout_secs.saturating_mul(1000);
    if timeout_ms <= config.latency.max_ms {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            format!(
                "must exceed the largest injected delay ({} ms)",
                config.latency.max_ms
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_probability(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        errors.push(ValidationError::new(
            field,
            format!("must be between 0.0 and 1.0, got {}", value),
        ));
    }
}
