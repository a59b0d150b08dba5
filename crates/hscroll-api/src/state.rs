//! Application state.

use std::sync::Arc;

use hscroll_cache::VerdictCache;
use hscroll_upstream::{
    GeminiClient, MetadataProvider, ThumbnailAnalyzer, TranscriptAnalyzer, VisionClient,
    VisionConfig, YouTubeClient,
};

use crate::config::ApiConfig;
use crate::services::{DailyBudget, VerdictService};

/// Shared application state, generic over the upstream handles so tests
/// can run the full router against stub analyzers.
pub struct AppState<M, T, I> {
    pub config: ApiConfig,
    pub cache: Arc<VerdictCache>,
    pub budget: Arc<DailyBudget>,
    pub verdict: Arc<VerdictService<M, T, I>>,
}

impl<M, T, I> Clone for AppState<M, T, I> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            cache: Arc::clone(&self.cache),
            budget: Arc::clone(&self.budget),
            verdict: Arc::clone(&self.verdict),
        }
    }
}

impl<M, T, I> AppState<M, T, I>
where
    M: MetadataProvider,
    T: TranscriptAnalyzer,
    I: ThumbnailAnalyzer,
{
    /// Assemble state from parts. The cache and budget handles are shared
    /// with the verdict service.
    pub fn new(config: ApiConfig, metadata: M, transcript: T, thumbnail: I) -> Self {
        let cache = Arc::new(VerdictCache::in_memory(config.cache_ttl_days));
        let budget = Arc::new(DailyBudget::new(config.global_daily_limit));
        Self::with_cache(config, metadata, transcript, thumbnail, cache, budget)
    }

    pub fn with_cache(
        config: ApiConfig,
        metadata: M,
        transcript: T,
        thumbnail: I,
        cache: Arc<VerdictCache>,
        budget: Arc<DailyBudget>,
    ) -> Self {
        let verdict = Arc::new(VerdictService::new(
            metadata,
            transcript,
            thumbnail,
            Arc::clone(&cache),
            Arc::clone(&budget),
        ));
        Self {
            config,
            cache,
            budget,
            verdict,
        }
    }
}

/// State wired to the production upstream clients.
pub type ProdState = AppState<YouTubeClient, GeminiClient, VisionClient>;

impl AppState<YouTubeClient, GeminiClient, VisionClient> {
    /// Create production state: upstream clients from their credentials,
    /// the cache backend selected by configuration.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let youtube = YouTubeClient::from_env()?;
        let gemini = GeminiClient::from_env()?;
        let vision = VisionClient::new(VisionConfig {
            api_key: std::env::var("VISION_API_KEY").unwrap_or_default(),
            threshold: config.image_safety_threshold,
            ..Default::default()
        })?;

        let cache = Arc::new(
            VerdictCache::connect(config.cache_backend_url.as_deref(), config.cache_ttl_days)
                .await,
        );
        let budget = Arc::new(DailyBudget::new(config.global_daily_limit));

        Ok(Self::with_cache(
            config, youtube, gemini, vision, cache, budget,
        ))
    }
}
