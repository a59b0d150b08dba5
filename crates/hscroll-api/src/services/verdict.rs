//! Verdict orchestrator: the request entry point.
//!
//! Sequencing per request: extract the canonical id, consult the budget,
//! consult the cache (hits are served regardless of budget), then enter
//! the single-flight build. The budget commit is the build's first act, so
//! concurrent callers for one video debit the budget exactly once, via the
//! single-flight winner's commit.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use hscroll_cache::{BuildError, VerdictCache};
use hscroll_models::{combine_verdict, extract_video_id, Verdict, VideoId};
use hscroll_upstream::{MetadataProvider, ThumbnailAnalyzer, TranscriptAnalyzer};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::rate_limit::DailyBudget;

/// Orchestrates one verdict request across the upstreams, the cache and
/// the daily budget. Constructed with explicit handles; holds no globals.
pub struct VerdictService<M, T, I> {
    metadata: M,
    transcript: T,
    thumbnail: I,
    cache: Arc<VerdictCache>,
    budget: Arc<DailyBudget>,
}

impl<M, T, I> VerdictService<M, T, I>
where
    M: MetadataProvider,
    T: TranscriptAnalyzer,
    I: ThumbnailAnalyzer,
{
    pub fn new(
        metadata: M,
        transcript: T,
        thumbnail: I,
        cache: Arc<VerdictCache>,
        budget: Arc<DailyBudget>,
    ) -> Self {
        Self {
            metadata,
            transcript,
            thumbnail,
            cache,
            budget,
        }
    }

    /// Resolve a user-supplied video URL to a safety verdict.
    pub async fn get_verdict(&self, raw_url: &str) -> ApiResult<Verdict> {
        let url = raw_url.trim();
        if url.is_empty() {
            return Err(ApiError::bad_request("video_url cannot be empty"));
        }

        let video_id = extract_video_id(url).map_err(|e| ApiError::bad_request(e.to_string()))?;

        let snapshot = self.budget.precheck();
        info!(
            video_id = %video_id,
            budget_count = snapshot.count,
            budget_limit = snapshot.limit,
            "Verdict requested"
        );

        // Cached verdicts are served even when the budget is exhausted;
        // they cost no upstream work.
        if let Some(cached) = self.cache.get(&video_id).await {
            info!(video_id = %video_id, "Serving cached verdict");
            return Ok(cached);
        }

        if snapshot.exhausted() {
            metrics::record_budget_rejection();
            return Err(ApiError::BudgetExhausted {
                limit: snapshot.limit,
                count_today: snapshot.count,
            });
        }

        let start = Instant::now();
        let result = self
            .cache
            .get_or_compute(&video_id, || self.build(&video_id))
            .await;

        match result {
            Ok(verdict) => {
                metrics::record_verdict(verdict.is_safe, start.elapsed());
                Ok(verdict)
            }
            Err(BuildError::Build(e)) => {
                if matches!(&e, ApiError::BudgetExhausted { .. }) {
                    metrics::record_budget_rejection();
                }
                Err(e)
            }
            Err(BuildError::Shared(detail)) => Err(ApiError::BuildFailed(detail)),
        }
    }

    /// The single-flight build: commit the budget, fetch metadata, fan out
    /// both branches, combine. Branch failures fold into the verdict; only
    /// the budget and the metadata fetch can fail the build.
    async fn build(&self, video_id: &VideoId) -> Result<Verdict, ApiError> {
        let count = self
            .budget
            .commit()
            .map_err(|snapshot| ApiError::BudgetExhausted {
                limit: snapshot.limit,
                count_today: snapshot.count,
            })?;

        info!(video_id = %video_id, budget_count = count, "Cache miss, running full analysis");

        let meta = self.metadata.fetch(video_id).await?;

        // Both branches always run to completion; neither is cancelled on
        // the other's failure, and the response carries both reasons.
        let (transcript, thumbnail) = tokio::join!(
            self.transcript.analyze(&meta),
            self.thumbnail.analyze(&meta.thumbnail_url),
        );

        let verdict = combine_verdict(&transcript, &thumbnail, &meta);
        info!(
            video_id = %video_id,
            is_safe = verdict.is_safe,
            is_safe_transcript = verdict.is_safe_transcript,
            is_safe_thumbnail = verdict.is_safe_thumbnail,
            "Verdict built"
        );
        Ok(verdict)
    }
}
