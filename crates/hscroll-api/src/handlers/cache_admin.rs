//! Cache admin handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use hscroll_cache::CacheStats;
use hscroll_upstream::{MetadataProvider, ThumbnailAnalyzer, TranscriptAnalyzer};

use crate::state::AppState;

/// Cache statistics response.
#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub status: String,
    pub cache_statistics: CacheStats,
    pub message: String,
}

/// Cache performance statistics for operator visibility.
pub async fn get_cache_statistics<M, T, I>(
    State(state): State<AppState<M, T, I>>,
) -> Json<CacheStatsResponse>
where
    M: MetadataProvider + 'static,
    T: TranscriptAnalyzer + 'static,
    I: ThumbnailAnalyzer + 'static,
{
    let stats = state.cache.stats().await;
    info!(hit_rate = stats.hit_rate_percentage, "Cache stats requested");

    let message = format!("Cache is {}% effective", stats.hit_rate_percentage);
    Json(CacheStatsResponse {
        status: "success".to_string(),
        cache_statistics: stats,
        message,
    })
}

/// Cache clear response.
#[derive(Serialize)]
pub struct CacheClearResponse {
    pub status: String,
    pub message: String,
    pub entries_removed: u64,
}

/// Drop all cached verdicts. Subsequent requests perform full analysis.
pub async fn clear_cache<M, T, I>(State(state): State<AppState<M, T, I>>) -> Json<CacheClearResponse>
where
    M: MetadataProvider + 'static,
    T: TranscriptAnalyzer + 'static,
    I: ThumbnailAnalyzer + 'static,
{
    let entries_removed = state.cache.clear().await;
    warn!(entries_removed, "Cache manually cleared");

    Json(CacheClearResponse {
        status: "success".to_string(),
        message: "Cache cleared successfully".to_string(),
        entries_removed,
    })
}
