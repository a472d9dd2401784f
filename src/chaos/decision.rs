//! Outcome of a chaos decision.

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;

/// Why a request was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Chaos is switched off.
    Disabled,
    /// The current environment is not in the allowed list.
    Environment,
    /// The request method is filtered out.
    Method,
    /// The path matches an excluded prefix.
    ExcludedPath,
    /// The request carries the bypass header.
    Bypass,
    /// The activation roll missed.
    NotSampled,
    /// Chaos activated but neither fault roll hit.
    NoFaultSelected,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Disabled => "disabled",
            SkipReason::Environment => "environment",
            SkipReason::Method => "method",
            SkipReason::ExcludedPath => "excluded_path",
            SkipReason::Bypass => "bypass",
            SkipReason::NotSampled => "not_sampled",
            SkipReason::NoFaultSelected => "no_fault_selected",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synthetic error to return instead of calling the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedError {
    pub status: StatusCode,
    pub message: String,
}

/// Faults chosen for a request. At least one field is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub delay: Option<Duration>,
    pub error: Option<InjectedError>,
}

/// Result of evaluating a request against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChaosDecision {
    Pass(SkipReason),
    Inject(Injection),
}

impl ChaosDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, ChaosDecision::Pass(_))
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            ChaosDecision::Inject(injection) => injection.delay,
            ChaosDecision::Pass(_) => None,
        }
    }

    pub fn error(&self) -> Option<&InjectedError> {
        match self {
            ChaosDecision::Inject(injection) => injection.error.as_ref(),
            ChaosDecision::Pass(_) => None,
        }
    }
}

impl fmt::Display for ChaosDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChaosDecision::Pass(reason) => write!(f, "pass ({})", reason),
            ChaosDecision::Inject(Injection { delay, error }) => {
                write!(f, "inject")?;
                if let Some(delay) = delay {
                    write!(f, " delay={}ms", delay.as_millis())?;
                }
                if let Some(error) = error {
                    write!(f, " error={}", error.status.as_u16())?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ChaosDecision::Pass(SkipReason::NotSampled).to_string(),
            "pass (not_sampled)"
        );

        let both = ChaosDecision::Inject(Injection {
            delay: Some(Duration::from_millis(250)),
            error: Some(InjectedError {
                status: StatusCode::BAD_GATEWAY,
                message: "boom".into(),
            }),
        });
        assert_eq!(both.to_string(), "inject delay=250ms error=502");
        assert_eq!(both.delay(), Some(Duration::from_millis(250)));
        assert_eq!(both.error().unwrap().status, StatusCode::BAD_GATEWAY);
        assert!(!both.is_pass());
    }
}
