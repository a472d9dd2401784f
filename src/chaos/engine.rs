//! Chaos decision engine.
//!
//! # Gating Order
//! ```text
//! enabled? → environment allowed? → method targeted? → path excluded?
//!     → bypass header? → activation roll
//!     → error roll + latency roll (independent)
//! ```
//!
//! The first failing gate yields `ChaosDecision::Pass` with its reason.
//! Rolls compare a uniform sample in `[0, 1)` against the probability with
//! strict `<`, so 0.0 never fires and 1.0 always fires.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::{Method, Request};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::chaos::decision::{ChaosDecision, InjectedError, Injection, SkipReason};
use crate::chaos::policy::{ChaosPolicy, ErrorPolicy, LatencyPolicy};

/// The parts of a request the engine looks at.
#[derive(Debug, Clone)]
pub struct RequestFacts {
    pub method: Method,
    pub path: String,
    pub bypass: bool,
}

impl RequestFacts {
    /// Extract facts from a request under the given policy.
    pub fn from_request<B>(request: &Request<B>, policy: &ChaosPolicy) -> Self {
        let bypass = policy
            .bypass_header
            .as_ref()
            .is_some_and(|name| request.headers().contains_key(name));

        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            bypass,
        }
    }
}

/// Holds the active policy and makes per-request decisions.
///
/// The policy sits behind an `ArcSwap` so reloads never block requests.
#[derive(Debug)]
pub struct ChaosEngine {
    policy: ArcSwap<ChaosPolicy>,
}

impl ChaosEngine {
    pub fn new(policy: ChaosPolicy) -> Self {
        Self {
            policy: ArcSwap::from_pointee(policy),
        }
    }

    /// Snapshot of the active policy.
    pub fn policy(&self) -> Arc<ChaosPolicy> {
        self.policy.load_full()
    }

    /// Atomically replace the active policy.
    pub fn update(&self, policy: ChaosPolicy) {
        tracing::info!(
            enabled = policy.enabled,
            environment = %policy.environment,
            probability = policy.probability,
            "Chaos policy updated"
        );
        self.policy.store(Arc::new(policy));
    }

    /// Decide against the active policy.
    pub fn decide<R: Rng + ?Sized>(&self, facts: &RequestFacts, rng: &mut R) -> ChaosDecision {
        decide(&self.policy.load(), facts, rng)
    }
}

/// Decide what to do with a request. Pure apart from the random source.
pub fn decide<R: Rng + ?Sized>(
    policy: &ChaosPolicy,
    facts: &RequestFacts,
    rng: &mut R,
) -> ChaosDecision {
    if !policy.enabled {
        return ChaosDecision::Pass(SkipReason::Disabled);
    }
    if !policy.is_active_environment() {
        return ChaosDecision::Pass(SkipReason::Environment);
    }
    if !policy.targets_method(&facts.method) {
        return ChaosDecision::Pass(SkipReason::Method);
    }
    if policy.is_excluded_path(&facts.path) {
        return ChaosDecision::Pass(SkipReason::ExcludedPath);
    }
    if facts.bypass {
        return ChaosDecision::Pass(SkipReason::Bypass);
    }
    if !roll(rng, policy.probability) {
        return ChaosDecision::Pass(SkipReason::NotSampled);
    }

    let error = policy.error.as_ref().and_then(|e| pick_error(e, rng));
    let delay = policy.latency.as_ref().and_then(|l| pick_delay(l, rng));

    if error.is_none() && delay.is_none() {
        return ChaosDecision::Pass(SkipReason::NoFaultSelected);
    }

    ChaosDecision::Inject(Injection { delay, error })
}

fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

fn pick_error<R: Rng + ?Sized>(policy: &ErrorPolicy, rng: &mut R) -> Option<InjectedError> {
    if !roll(rng, policy.probability) {
        return None;
    }
    policy.status_codes.choose(rng).map(|&status| InjectedError {
        status,
        message: policy.message.clone(),
    })
}

fn pick_delay<R: Rng + ?Sized>(policy: &LatencyPolicy, rng: &mut R) -> Option<Duration> {
    if !roll(rng, policy.probability) {
        return None;
    }
    let min_ms = policy.min.as_millis() as u64;
    let max_ms = policy.max.as_millis() as u64;
    Some(Duration::from_millis(rng.gen_range(min_ms..=max_ms)))
}
