//! HTTP server for probe and info endpoints
//!
//! Provides Kubernetes health probes:
//! - `/health` - Liveness probe (process is running)
//! - `/ready` - Readiness probe (service is ready to serve)
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

mod listener;
mod routes;
pub mod shutdown;

pub use listener::{DrainOutcome, ServerError, ServerHandle};
pub use routes::{
    build_router, render_index, AppState, HealthStatus, InfoResponse, ReadyResponse, ReadyStatus,
    StatusResponse, APP_NAME, APP_VERSION, REFRESH_INTERVAL_SECS,
};
pub use shutdown::{
    forward_signals, shutdown_channel, ServiceState, ShutdownController, ShutdownSignal,
    TerminationSignals,
};

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;

#[cfg(test)]
#[path = "listener_test.rs"]
mod listener_tests;
