//! Compiled chaos policy.
//!
//! `ChaosConfig` is what operators write; `ChaosPolicy` is what the engine
//! reads on every request. Compilation parses method names, the bypass
//! header and status codes once, and resolves the current environment.

use std::str::FromStr;
use std::time::Duration;

use axum::http::{HeaderName, Method, StatusCode};
use thiserror::Error;

use crate::config::schema::ChaosConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error raised when a configuration cannot be turned into a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<ValidationError>),

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid bypass header '{0}'")]
    InvalidHeader(String),

    #[error("invalid status code {0}")]
    InvalidStatus(u16),
}

/// Runtime latency settings. Present only when latency injection is enabled.
#[derive(Debug, Clone)]
pub struct LatencyPolicy {
    pub probability: f64,
    pub min: Duration,
    pub max: Duration,
}

/// Runtime error settings. Present only when error injection is enabled.
#[derive(Debug, Clone)]
pub struct ErrorPolicy {
    pub probability: f64,
    pub status_codes: Vec<StatusCode>,
    pub message: String,
}

/// Immutable, pre-parsed chaos policy.
#[derive(Debug, Clone)]
pub struct ChaosPolicy {
    pub enabled: bool,
    pub environment: String,
    pub allowed_environments: Vec<String>,
    pub probability: f64,
    pub methods: Vec<Method>,
    pub exclude_paths: Vec<String>,
    pub bypass_header: Option<HeaderName>,
    pub latency: Option<LatencyPolicy>,
    pub error: Option<ErrorPolicy>,
    source: ChaosConfig,
}

impl ChaosPolicy {
    /// Validate and compile a configuration into a runtime policy.
    pub fn compile(config: &ChaosConfig) -> Result<Self, PolicyError> {
        validate_config(config).map_err(PolicyError::Validation)?;

        let methods = config
            .methods
            .iter()
            .map(|m| {
                Method::from_str(&m.trim().to_uppercase())
                    .map_err(|_| PolicyError::InvalidMethod(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bypass_header = config
            .bypass_header
            .as_deref()
            .map(|h| HeaderName::from_str(h).map_err(|_| PolicyError::InvalidHeader(h.to_string())))
            .transpose()?;

        let latency = if config.latency.enabled {
            Some(LatencyPolicy {
                probability: config.latency.probability,
                min: Duration::from_millis(config.latency.min_ms),
                max: Duration::from_millis(config.latency.max_ms),
            })
        } else {
            None
        };

        let error = if config.error.enabled {
            let status_codes = config
                .error
                .status_codes
                .iter()
                .map(|&code| {
                    StatusCode::from_u16(code)
                        .ok()
                        .filter(|s| s.is_client_error() || s.is_server_error())
                        .ok_or(PolicyError::InvalidStatus(code))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(ErrorPolicy {
                probability: config.error.probability,
                status_codes,
                message: config.error.message.clone(),
            })
        } else {
            None
        };

        Ok(Self {
            enabled: config.enabled,
            environment: config.resolved_environment(),
            allowed_environments: config
                .allowed_environments
                .iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
            probability: config.probability,
            methods,
            exclude_paths: config.exclude_paths.clone(),
            bypass_header,
            latency,
            error,
            source: config.clone(),
        })
    }

    /// Whether the resolved environment is one chaos may run in.
    pub fn is_active_environment(&self) -> bool {
        let current = self.environment.trim().to_lowercase();
        self.allowed_environments.iter().any(|e| *e == current)
    }

    /// Whether requests with this method are subject to chaos.
    pub fn targets_method(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Whether the path falls under an excluded prefix.
    pub fn is_excluded_path(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// The configuration this policy was compiled from.
    pub fn source(&self) -> &ChaosConfig {
        &self.source
    }
}
