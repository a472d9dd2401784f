//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (any tower/axum pipeline)
//!     → layer.rs (ChaosService: ask engine, sleep, short-circuit)
//!     → response.rs (synthetic error body, x-chaos-* headers)
//!     → inner service, unchanged when chaos passes
//!
//! Sidecar mode (server.rs):
//!     listener → TraceLayer → TimeoutLayer → ChaosLayer → forward/echo
//! ```

pub mod layer;
pub mod response;
pub mod server;

pub use layer::{ChaosLayer, ChaosService};
pub use response::{X_CHAOS_DELAY_MS, X_CHAOS_INJECTED};
pub use server::HttpServer;
