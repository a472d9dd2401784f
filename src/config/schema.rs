//! Configuration schema definitions.
//!
//! This module defines the complete declarative chaos policy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Environment variable consulted when no environment is configured.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Root configuration for the chaos interceptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Master switch. When false every request passes through.
    pub enabled: bool,

    /// Current environment. Falls back to `APP_ENV`, then "development".
    pub environment: Option<String>,

    /// Environments in which chaos may be applied.
    pub allowed_environments: Vec<String>,

    /// Probability that chaos applies to a given request (0.0 - 1.0).
    pub probability: f64,

    /// HTTP methods subject to chaos. Empty means all methods.
    pub methods: Vec<String>,

    /// Path prefixes that are never subjected to chaos.
    pub exclude_paths: Vec<String>,

    /// Requests carrying this header skip chaos entirely.
    pub bypass_header: Option<String>,

    /// Latency injection settings.
    pub latency: LatencyConfig,

    /// Error injection settings.
    pub error: ErrorConfig,

    /// Sidecar server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            environment: None,
            allowed_environments: vec!["development".to_string(), "test".to_string()],
            probability: 0.1,
            methods: Vec::new(),
            exclude_paths: vec!["/health".to_string()],
            bypass_header: Some("x-chaos-bypass".to_string()),
            latency: LatencyConfig::default(),
            error: ErrorConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ChaosConfig {
    /// Resolve the environment this process runs in.
    pub fn resolved_environment(&self) -> String {
        resolve_environment(
            self.environment.as_deref(),
            std::env::var(ENVIRONMENT_VAR).ok().as_deref(),
        )
    }
}

/// First non-blank of the configured value and `APP_ENV`, else "development".
fn resolve_environment(configured: Option<&str>, from_env: Option<&str>) -> String {
    configured
        .into_iter()
        .chain(from_env)
        .map(str::trim)
        .find(|env| !env.is_empty())
        .unwrap_or("development")
        .to_string()
}

/// Latency injection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Enable latency injection.
    pub enabled: bool,

    /// Probability of delaying an activated request.
    pub probability: f64,

    /// Minimum injected delay in milliseconds.
    pub min_ms: u64,

    /// Maximum injected delay in milliseconds (inclusive).
    pub max_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probability: 0.5,
            min_ms: 100,
            max_ms: 2000,
        }
    }
}

/// Error injection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Enable error injection.
    pub enabled: bool,

    /// Probability of failing an activated request.
    pub probability: f64,

    /// Status codes to pick from, uniformly.
    pub status_codes: Vec<u16>,

    /// Message placed in the synthetic error body.
    pub message: String,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probability: 0.5,
            status_codes: vec![500, 502, 503, 504],
            message: "Chaos injected failure".to_string(),
        }
    }
}

/// Sidecar server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8088").
    pub bind_address: String,

    /// Upstream base URL. When unset the sidecar echoes requests.
    pub upstream: Option<String>,

    /// Request timeout in seconds. Must exceed the largest injected delay.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8088".to_string(),
            upstream: None,
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
