//! Verdict API handler.

use axum::extract::State;
use axum::Json;
use schemars::JsonSchema;
use serde::Deserialize;

use hscroll_models::Verdict;
use hscroll_upstream::{MetadataProvider, ThumbnailAnalyzer, TranscriptAnalyzer};

use crate::error::ApiResult;
use crate::state::AppState;

/// Request body for the verdict endpoint.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerdictRequest {
    /// Video URL to analyze.
    pub video_url: String,
}

/// Combined video safety verdict.
///
/// Runs the transcript and thumbnail analyses in parallel on a cache miss
/// and serves the cached verdict otherwise. Only new analyses count
/// against the daily budget.
pub async fn get_video_verdict<M, T, I>(
    State(state): State<AppState<M, T, I>>,
    Json(request): Json<VerdictRequest>,
) -> ApiResult<Json<Verdict>>
where
    M: MetadataProvider + 'static,
    T: TranscriptAnalyzer + 'static,
    I: ThumbnailAnalyzer + 'static,
{
    let verdict = state.verdict.get_verdict(&request.video_url).await?;
    Ok(Json(verdict))
}
