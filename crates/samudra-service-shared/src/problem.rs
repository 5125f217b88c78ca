//! RFC 9457 Problem Details for HTTP APIs.
//!
//! Provides structured error responses following the Problem Details standard.
//! See: <https://www.rfc-editor.org/rfc/rfc9457.html>

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use samudra_lib::{Error as LibError, ErrorKind};

/// Problem type URI for missing or invalid request parameters.
pub const PROBLEM_INVALID_REQUEST: &str = "/problems/invalid-request";

/// Problem type URI for parameters an engine refused.
pub const PROBLEM_ENGINE_REJECTED_INPUT: &str = "/problems/engine-rejected-input";

/// Problem type URI for runs whose engines did not write the expected routes.
pub const PROBLEM_INCOMPLETE_OUTPUT: &str = "/problems/incomplete-output";

/// Problem type URI for internal server errors.
pub const PROBLEM_INTERNAL_ERROR: &str = "/problems/internal-error";

/// Problem type URI for service unavailable (e.g., unwritable workspace).
pub const PROBLEM_SERVICE_UNAVAILABLE: &str = "/problems/service-unavailable";

/// RFC 9457 Problem Details response structure.
///
/// # Example
///
/// ```
/// use samudra_service_shared::{ProblemDetails, PROBLEM_INVALID_REQUEST};
/// use axum::http::StatusCode;
///
/// let problem = ProblemDetails::new(
///     PROBLEM_INVALID_REQUEST,
///     "Invalid Request",
///     StatusCode::BAD_REQUEST,
/// )
/// .with_detail("missing parameters: goal_lat")
/// .with_request_id("req-12345");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type (relative).
    #[serde(rename = "type")]
    pub type_uri: String,

    /// Short, human-readable summary of the problem.
    pub title: String,

    /// HTTP status code for this problem.
    pub status: u16,

    /// Human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// URI reference identifying the specific occurrence (e.g., request ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Flat error message for clients that read a single `error` key.
    ///
    /// Mirrors `detail` when set, otherwise `title`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Names of missing request parameters, when that is the problem.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,

    /// Content type for this response (always "application/problem+json").
    pub content_type: String,
}

impl ProblemDetails {
    /// Create a new ProblemDetails with required fields.
    pub fn new(type_uri: impl Into<String>, title: impl Into<String>, status: StatusCode) -> Self {
        let title = title.into();
        Self {
            type_uri: type_uri.into(),
            error: Some(title.clone()),
            title,
            status: status.as_u16(),
            detail: None,
            instance: None,
            missing: Vec::new(),
            content_type: "application/problem+json".to_string(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.error = Some(detail.clone());
        self.detail = Some(detail);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.instance = Some(request_id.into());
        self
    }

    /// Create a 400 Bad Request problem for invalid input.
    pub fn bad_request(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INVALID_REQUEST,
            "Invalid Request",
            StatusCode::BAD_REQUEST,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 400 listing every missing parameter by name.
    pub fn missing_parameters(missing: &[String], request_id: impl Into<String>) -> Self {
        let mut problem = Self::bad_request(
            format!("Missing parameters: {}", missing.join(", ")),
            request_id,
        );
        problem.missing = missing.to_vec();
        problem
    }

    /// 400 for parameters an engine rejected.
    pub fn engine_rejected(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_ENGINE_REJECTED_INPUT,
            "Engine Rejected Input",
            StatusCode::BAD_REQUEST,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// 500 for runs that finished without their required routes.
    pub fn incomplete_output(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INCOMPLETE_OUTPUT,
            "Incomplete Output",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// Create a 500 Internal Server Error problem.
    pub fn internal_error(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_INTERNAL_ERROR,
            "Internal Error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }

    /// Create a 503 Service Unavailable problem.
    pub fn service_unavailable(detail: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(
            PROBLEM_SERVICE_UNAVAILABLE,
            "Service Unavailable",
            StatusCode::SERVICE_UNAVAILABLE,
        )
        .with_detail(detail)
        .with_request_id(request_id)
    }
}

impl std::fmt::Display for ProblemDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.title,
            self.detail.as_deref().unwrap_or("")
        )
    }
}

impl std::error::Error for ProblemDetails {}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = Json(&self).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        *response.status_mut() = status;
        response
    }
}

/// Convert pipeline errors to ProblemDetails.
///
/// Client-caused failures map to 400, everything else to 500. The
/// `request_id` must be provided separately since library errors don't have it.
pub fn from_lib_error(error: &LibError, request_id: &str) -> ProblemDetails {
    match error {
        LibError::MissingParameters { missing } => {
            ProblemDetails::missing_parameters(missing, request_id)
        }
        _ => match error.kind() {
            ErrorKind::Validation => ProblemDetails::bad_request(error.to_string(), request_id),
            ErrorKind::EngineInput => {
                ProblemDetails::engine_rejected(error.to_string(), request_id)
            }
            ErrorKind::IncompleteOutput => {
                ProblemDetails::incomplete_output(error.to_string(), request_id)
            }
            ErrorKind::Io | ErrorKind::Config | ErrorKind::Internal => {
                ProblemDetails::internal_error(error.to_string(), request_id)
            }
        },
    }
}
