//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use hscroll_upstream::{MetadataProvider, ThumbnailAnalyzer, TranscriptAnalyzer};

use crate::handlers::{clear_cache, get_cache_statistics, get_video_verdict, health};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router<M, T, I>(
    state: AppState<M, T, I>,
    metrics_handle: Option<PrometheusHandle>,
) -> Router
where
    M: MetadataProvider + 'static,
    T: TranscriptAnalyzer + 'static,
    I: ThumbnailAnalyzer + 'static,
{
    // Per-IP transport limiter for the verdict surface; health and
    // metrics probes stay unthrottled.
    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let verdict_routes = Router::new()
        .route("/happyScroll/v1/verdict", post(get_video_verdict::<M, T, I>))
        .route(
            "/happyScroll/v1/cache/stats",
            get(get_cache_statistics::<M, T, I>),
        )
        .route("/happyScroll/v1/cache/clear", post(clear_cache::<M, T, I>))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new().route("/health", get(health));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", verdict_routes.merge(health_routes))
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
