//! Development-time HTTP chaos interceptor.
//!
//! Sits inline in a request pipeline and, per a declarative policy,
//! randomly delays requests and/or answers them with synthetic errors.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use chaos_proxy::{ChaosConfig, ChaosLayer, ChaosPolicy};
//!
//! # fn build() -> Result<Router, chaos_proxy::chaos::PolicyError> {
//! let policy = ChaosPolicy::compile(&ChaosConfig::default())?;
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .layer(ChaosLayer::new(policy));
//! # Ok(app)
//! # }
//! ```

pub mod chaos;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use chaos::{ChaosDecision, ChaosEngine, ChaosPolicy};
pub use config::ChaosConfig;
pub use http::{ChaosLayer, HttpServer};
pub use lifecycle::Shutdown;
