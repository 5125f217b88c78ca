//! Health check handlers for Kubernetes probes.
//!
//! Provides `/health/live` and `/health/ready` endpoints that return JSON
//! status responses for Kubernetes liveness and readiness probes.

use std::path::Path;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    /// Service name for identification.
    pub service: String,

    /// Service version from build-time.
    pub version: String,

    /// Whether the workspace can be written (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_writable: Option<bool>,

    /// Whether the destination area can be written (for readiness check).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_writable: Option<bool>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            workspace_writable: None,
            destination_writable: None,
        }
    }

    pub fn ready(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            workspace_writable: Some(true),
            destination_writable: Some(true),
        }
    }

    pub fn not_ready(
        service: &str,
        version: &str,
        reason: &str,
        workspace_writable: bool,
        destination_writable: bool,
    ) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            workspace_writable: Some(workspace_writable),
            destination_writable: Some(destination_writable),
        }
    }
}

/// Whether `dir` is, or could be created as, a writable directory.
///
/// Walks up to the nearest existing ancestor without creating anything.
fn is_writable_dir(dir: &Path) -> bool {
    let existing = dir.ancestors().find(|candidate| candidate.exists());
    match existing.and_then(|path| path.metadata().ok()) {
        Some(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
        None => false,
    }
}

/// Liveness probe handler.
///
/// Returns 200 OK if the service is running. This is a simple check that does
/// not depend on external resources.
///
/// # Example
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"samudra-service-shared","version":"0.1.0"}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler.
///
/// Returns 200 OK when both the workspace and the destination area are
/// writable (or creatable), 503 otherwise.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let workspace = is_writable_dir(state.workspace_dir());
    let destination = is_writable_dir(state.destination_dir());

    if !workspace || !destination {
        let reason = if !workspace {
            "workspace not writable"
        } else {
            "destination not writable"
        };
        let status = HealthStatus::not_ready(service, version, reason, workspace, destination);
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    (StatusCode::OK, Json(HealthStatus::ready(service, version))).into_response()
}
