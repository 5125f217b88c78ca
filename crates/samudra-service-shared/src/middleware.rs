//! Request correlation and HTTP metrics middleware.
//!
//! Every request gets a [`RequestId`]: the incoming `X-Request-ID` header when
//! present, otherwise a fresh UUID v7. [`MetricsLayer`] opens a tracing span
//! carrying that id and records:
//!
//! - `http_requests_total`: counter by method, path, status class
//! - `http_request_duration_seconds`: histogram by method, path

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{HeaderMap, Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use tracing::{info_span, Span};
use uuid::Uuid;

/// Header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id attached to logs and problem details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a time-sortable UUID v7 id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Use the caller's `X-Request-ID` if it is non-empty UTF-8, otherwise generate one.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

fn record_request(method: &str, path: &str, status: &'static str, started: Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

/// Tower layer recording per-request metrics inside a request span.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ReqBody: http_body::Body,
    ResBody: http_body::Body,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = MetricsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().to_string();
        // Only the path: query strings would explode label cardinality.
        let path = req.uri().path().to_string();
        let request_id = extract_or_generate_request_id(req.headers());

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
        );

        MetricsFuture {
            inner: span.in_scope(|| self.inner.call(req)),
            started: Instant::now(),
            method,
            path,
            span,
        }
    }
}

pin_project! {
    /// Completes the inner future and records its outcome.
    pub struct MetricsFuture<F> {
        #[pin]
        inner: F,
        started: Instant,
        method: String,
        path: String,
        span: Span,
    }
}

impl<F, ResBody, E> Future for MetricsFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _enter = this.span.enter();

        let result = match this.inner.poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };

        let latency_ms = this.started.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(response) => {
                let status = response.status().as_u16();
                record_request(this.method, this.path, status_class(status), *this.started);
                tracing::info!(status, latency_ms, "request completed");
            }
            Err(_) => {
                record_request(this.method, this.path, "5xx", *this.started);
                tracing::error!(latency_ms, "request failed");
            }
        }
        Poll::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_header_id_is_used() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("voyage-42"));
        assert_eq!(extract_or_generate_request_id(&headers).as_str(), "voyage-42");
    }

    #[test]
    fn test_blank_header_generates() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(extract_or_generate_request_id(&headers).as_str().len(), 36);
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(400), "4xx");
        assert_eq!(status_class(503), "5xx");
        assert_eq!(status_class(99), "other");
    }
}
