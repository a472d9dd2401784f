//! Chaos decision subsystem.
//!
//! # Data Flow
//! ```text
//! ChaosConfig
//!     → policy.rs (compile: parse methods, header, statuses; resolve env)
//!     → ChaosPolicy (immutable, held in ChaosEngine behind ArcSwap)
//!
//! Per request:
//!     RequestFacts (method, path, bypass)
//!     → engine.rs (gates, then random rolls)
//!     → decision.rs (Pass(reason) | Inject { delay, error })
//! ```
//!
//! # Design Decisions
//! - No state carried between requests
//! - Randomness is injected (`rand::Rng`) so decisions are testable with seeds
//! - Error and latency rolls are independent; both may fire

pub mod decision;
pub mod engine;
pub mod policy;

pub use decision::{ChaosDecision, InjectedError, Injection, SkipReason};
pub use engine::{decide, ChaosEngine, RequestFacts};
pub use policy::{ChaosPolicy, PolicyError};
