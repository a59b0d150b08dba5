//! Upstream clients for the HappyScroll verdict service.
//!
//! Three black-box remote services feed the verdict core:
//! - the video platform's data API (metadata, thumbnails, captions),
//! - the image-safety classifier (SafeSearch),
//! - the text policy classifier (Gemini).
//!
//! The orchestrator consumes them through the traits below so tests can
//! inject stubs; the concrete clients here are the production
//! implementations.

use std::future::Future;

use hscroll_models::{BranchResult, VideoId, VideoMetadata};

pub mod error;
pub mod gemini;
pub mod vision;
pub mod youtube;

pub use error::{UpstreamError, UpstreamResult};
pub use gemini::{GeminiClient, GeminiConfig};
pub use vision::{VisionClient, VisionConfig};
pub use youtube::{YouTubeClient, YouTubeConfig};

/// Fetches metadata for a canonical video id. A failure here aborts the
/// whole verdict build; both branches require metadata.
pub trait MetadataProvider: Send + Sync {
    fn fetch(
        &self,
        id: &VideoId,
    ) -> impl Future<Output = UpstreamResult<VideoMetadata>> + Send;
}

/// Judges the caption text (plus title and channel). Errors fold into the
/// branch result; they never fail the request.
pub trait TranscriptAnalyzer: Send + Sync {
    fn analyze(&self, meta: &VideoMetadata) -> impl Future<Output = BranchResult> + Send;
}

/// Judges the thumbnail image by URL. Errors fold into the branch result;
/// they never fail the request.
pub trait ThumbnailAnalyzer: Send + Sync {
    fn analyze(&self, thumbnail_url: &str) -> impl Future<Output = BranchResult> + Send;
}
