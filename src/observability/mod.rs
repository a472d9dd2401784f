//! Observability subsystem.
//!
//! Every chaos decision is emitted as a structured `tracing` event:
//! debug level for passes (with the skip reason), info level for
//! injections (with delay and status).

pub mod logging;

pub use logging::init_logging;
