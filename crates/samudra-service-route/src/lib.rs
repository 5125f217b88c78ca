//! Samudra route pipeline HTTP service.
//!
//! # Endpoints
//!
//! - `POST /calculate_route` - Run the full pipeline for one voyage
//! - `POST /new_position` - Run the optimizer in repositioning mode
//! - `POST /new_positon` - Legacy misspelled alias of `/new_position`
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - Kubernetes liveness probe
//! - `GET /health/ready` - Kubernetes readiness probe

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use samudra_lib::{Acknowledgement, RepositionParameters, RouteComputation, RouteParameters};
use samudra_service_shared::{
    AppState, MetricsLayer, ProblemDetails, ServiceResponse, Validate,
    extract_or_generate_request_id, from_lib_error, health_live, health_ready, metrics_handler,
    record_artifacts_published, record_pipeline_completed, record_pipeline_duration,
    record_pipeline_failed,
};

const COMPUTE_ROUTE: &str = "compute_route";
const REPOSITION: &str = "reposition";

/// HTTP response - either success or RFC 9457 error.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Response<T> {
    Success(ServiceResponse<T>),
    Error(ProblemDetails),
}

impl<T: Serialize> IntoResponse for Response<T> {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Success(data) => (StatusCode::OK, Json(data)).into_response(),
            Response::Error(problem) => problem.into_response(),
        }
    }
}

/// Build the service router around `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/calculate_route", post(calculate_route_handler))
        .route("/new_position", post(new_position_handler))
        .route("/new_positon", post(new_position_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .layer(MetricsLayer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn body_problem(rejection: JsonRejection, request_id: &str) -> ProblemDetails {
    ProblemDetails::bad_request(rejection.body_text(), request_id)
}

/// Handle POST /calculate_route requests.
async fn calculate_route_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RouteParameters>, JsonRejection>,
) -> Response<RouteComputation> {
    let request_id = extract_or_generate_request_id(&headers).0;

    let params = match body {
        Ok(Json(params)) => params,
        Err(rejection) => {
            record_pipeline_failed(COMPUTE_ROUTE, "validation_error");
            return Response::Error(body_problem(rejection, &request_id));
        }
    };

    if let Err(problem) = params.validate(&request_id) {
        record_pipeline_failed(COMPUTE_ROUTE, "validation_error");
        return Response::Error(*problem);
    }

    info!(
        request_id = %request_id,
        start_lat = ?params.start_lat,
        start_lon = ?params.start_lon,
        goal_lat = ?params.goal_lat,
        goal_lon = ?params.goal_lon,
        "handling route calculation"
    );

    let orchestrator = state.orchestrator();
    let started = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || orchestrator.compute_route(&params)).await;
    record_pipeline_duration(COMPUTE_ROUTE, started.elapsed());

    match outcome {
        Ok(Ok(computation)) => {
            record_pipeline_completed(COMPUTE_ROUTE);
            record_artifacts_published(computation.published.len());
            info!(
                request_id = %request_id,
                published = computation.published.len(),
                "route calculation completed"
            );
            Response::Success(ServiceResponse::new(computation))
        }
        Ok(Err(e)) => {
            warn!(request_id = %request_id, error = %e, "route calculation failed");
            record_pipeline_failed(COMPUTE_ROUTE, e.kind().as_str());
            Response::Error(from_lib_error(&e, &request_id))
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "route calculation task aborted");
            record_pipeline_failed(COMPUTE_ROUTE, "internal_error");
            Response::Error(ProblemDetails::internal_error(e.to_string(), request_id))
        }
    }
}

/// Handle POST /new_position requests.
async fn new_position_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RepositionParameters>, JsonRejection>,
) -> Response<Acknowledgement> {
    let request_id = extract_or_generate_request_id(&headers).0;

    let params = match body {
        Ok(Json(params)) => params,
        Err(rejection) => {
            record_pipeline_failed(REPOSITION, "validation_error");
            return Response::Error(body_problem(rejection, &request_id));
        }
    };

    if let Err(problem) = params.validate(&request_id) {
        record_pipeline_failed(REPOSITION, "validation_error");
        return Response::Error(*problem);
    }

    info!(request_id = %request_id, flag = ?params.flag, "handling reposition");

    let orchestrator = state.orchestrator();
    let started = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || orchestrator.reposition(&params)).await;
    record_pipeline_duration(REPOSITION, started.elapsed());

    match outcome {
        Ok(Ok(ack)) => {
            record_pipeline_completed(REPOSITION);
            Response::Success(ServiceResponse::new(ack))
        }
        Ok(Err(e)) => {
            warn!(request_id = %request_id, error = %e, "reposition failed");
            record_pipeline_failed(REPOSITION, e.kind().as_str());
            Response::Error(from_lib_error(&e, &request_id))
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "reposition task aborted");
            record_pipeline_failed(REPOSITION, "internal_error");
            Response::Error(ProblemDetails::internal_error(e.to_string(), request_id))
        }
    }
}
