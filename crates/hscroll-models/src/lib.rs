//! Shared data models for the HappyScroll verdict service.
//!
//! This crate provides the pure, I/O-free core of the service:
//! - Canonical video identity and URL extraction
//! - Video metadata and caption provenance
//! - The SafeSearch likelihood scale
//! - Branch results, the combined verdict, and the combiner

pub mod likelihood;
pub mod url;
pub mod verdict;
pub mod video;

pub use likelihood::Likelihood;
pub use url::{extract_video_id, UrlError};
pub use verdict::{
    combine_verdict, truncate_reason, BranchErrorKind, BranchResult, Verdict, MAX_REASON_LEN,
};
pub use video::{CaptionSource, VideoId, VideoMetadata};
