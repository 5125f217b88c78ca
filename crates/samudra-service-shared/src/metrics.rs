//! Prometheus metrics for the Samudra services.
//!
//! - [`MetricsConfig`]: Configuration for the metrics system
//! - [`init_metrics`]: Install the Prometheus recorder
//! - [`metrics_handler`]: Axum handler for the `/metrics` endpoint
//! - Pipeline metric helpers
//!
//! # Example
//!
//! ```no_run
//! use samudra_service_shared::metrics::{MetricsConfig, init_metrics, metrics_handler};
//! use axum::{Router, routing::get};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("failed to initialize metrics");
//!
//! let app: Router = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Path for the metrics endpoint.
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Read `METRICS_ENABLED` (default true) and `METRICS_PATH` (default `/metrics`).
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);
        let path = std::env::var("METRICS_PATH").unwrap_or_else(|_| "/metrics".to_string());

        Self { enabled, path }
    }
}

/// Install the Prometheus recorder.
///
/// # Errors
///
/// Fails when metrics are disabled, when a recorder is already installed, or
/// when the exporter cannot be built.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Returns `None` until [`init_metrics`] succeeds.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Prometheus exposition text for the `/metrics` endpoint.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

#[derive(Debug, Clone)]
pub enum MetricsError {
    Disabled,
    AlreadyInitialized,
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

// =============================================================================
// Pipeline metrics
// =============================================================================

/// Increment `samudra_pipeline_runs_total` for a successful run.
///
/// `operation` is `compute_route` or `reposition`.
pub fn record_pipeline_completed(operation: &str) {
    metrics::counter!(
        "samudra_pipeline_runs_total",
        "operation" => operation.to_string(),
        "outcome" => "success"
    )
    .increment(1);
}

/// Increment `samudra_pipeline_failures_total`, labelled with the error kind.
pub fn record_pipeline_failed(operation: &str, kind: &str) {
    metrics::counter!(
        "samudra_pipeline_failures_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record wall-clock time of a run in `samudra_pipeline_duration_seconds`.
pub fn record_pipeline_duration(operation: &str, elapsed: Duration) {
    metrics::histogram!(
        "samudra_pipeline_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record how many artifacts one run published.
pub fn record_artifacts_published(count: usize) {
    metrics::histogram!("samudra_artifacts_published").record(count as f64);
}
