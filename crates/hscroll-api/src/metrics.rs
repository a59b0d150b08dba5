//! Prometheus metrics for the API server.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "hscroll_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "hscroll_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "hscroll_http_requests_in_flight";

    // Verdict metrics
    pub const VERDICTS_TOTAL: &str = "hscroll_verdicts_total";
    pub const VERDICT_BUILD_DURATION_SECONDS: &str = "hscroll_verdict_build_duration_seconds";

    // Gate metrics
    pub const BUDGET_REJECTIONS_TOTAL: &str = "hscroll_budget_rejections_total";
    pub const RATE_LIMIT_HITS_TOTAL: &str = "hscroll_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a freshly built verdict and its build duration.
pub fn record_verdict(is_safe: bool, duration: Duration) {
    let outcome = if is_safe { "safe" } else { "unsafe" };
    let labels = [("outcome", outcome.to_string())];
    counter!(names::VERDICTS_TOTAL, &labels).increment(1);
    histogram!(names::VERDICT_BUILD_DURATION_SECONDS).record(duration.as_secs_f64());
}

/// Record a request rejected by the daily analysis budget.
pub fn record_budget_rejection() {
    counter!(names::BUDGET_REJECTIONS_TOTAL).increment(1);
}

/// Record a request rejected by the per-IP transport limiter.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests. All routes here are static, so
/// the raw path is a safe label.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}
