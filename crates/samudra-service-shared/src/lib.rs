//! Shared infrastructure for Samudra HTTP services.
//!
//! This crate provides the HTTP glue used by the service binaries:
//!
//! - [`AppState`]: the pipeline orchestrator shared by all handlers
//! - Health probes: liveness/readiness for the workspace and destination
//! - [`ProblemDetails`]: RFC 9457 Problem Details for consistent error responses
//! - [`ServiceResponse`]: Wrapper for successful responses with content type
//! - [`metrics`]: Prometheus metrics infrastructure
//! - [`logging`]: Structured JSON logging setup
//! - [`middleware`]: Request tracking and metrics middleware
//! - Request validation for each endpoint
//!
//! # Architecture
//!
//! Handlers are thin: all pipeline semantics live in `samudra-lib`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Parse request JSON                                       │
//! │  - Validate parameters                                      │
//! │  - Run the orchestrator on the blocking pool                │
//! │  - Format response                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides engine doubles and a temporary
//! workspace for handler tests. Enable the `test-utils` feature to access it
//! from dependent crates.

mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod problem;
mod request;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_artifacts_published, record_pipeline_completed,
    record_pipeline_duration, record_pipeline_failed, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId};
pub use problem::{
    from_lib_error, ProblemDetails, PROBLEM_ENGINE_REJECTED_INPUT, PROBLEM_INCOMPLETE_OUTPUT,
    PROBLEM_INTERNAL_ERROR, PROBLEM_INVALID_REQUEST, PROBLEM_SERVICE_UNAVAILABLE,
};
pub use request::Validate;
pub use response::ServiceResponse;
pub use state::{AppState, AppStateError};
