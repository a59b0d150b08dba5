//! Upstream error types.

use thiserror::Error;

use hscroll_models::{BranchErrorKind, BranchResult};

pub type UpstreamResult<T> = Result<T, UpstreamError>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("VideoNotFound: {0}")]
    VideoNotFound(String),

    #[error("MetadataUnavailable: {0}")]
    MetadataUnavailable(String),

    #[error("PermissionDenied: {0}")]
    PermissionDenied(String),

    #[error("UpstreamUnavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("ImageFetchFailed: {0}")]
    ImageFetchFailed(String),

    #[error("ClassifierUnavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("ClassifierUnparseable: {0}")]
    ClassifierUnparseable(String),

    #[error("ClassifierRejected: {0}")]
    ClassifierRejected(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl UpstreamError {
    pub fn video_not_found(msg: impl Into<String>) -> Self {
        Self::VideoNotFound(msg.into())
    }

    pub fn metadata_unavailable(msg: impl Into<String>) -> Self {
        Self::MetadataUnavailable(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Classify this error for inclusion in a branch result.
    pub fn branch_kind(&self) -> BranchErrorKind {
        match self {
            UpstreamError::ImageFetchFailed(_) => BranchErrorKind::ImageFetchFailed,
            UpstreamError::ClassifierUnparseable(_) => BranchErrorKind::ClassifierUnparseable,
            UpstreamError::ClassifierRejected(_) | UpstreamError::PermissionDenied(_) => {
                BranchErrorKind::ClassifierRejected
            }
            _ => BranchErrorKind::ClassifierUnavailable,
        }
    }

    /// Fold this error into a failed branch result (fail-closed).
    pub fn into_branch_result(self) -> BranchResult {
        let detail = match &self {
            UpstreamError::VideoNotFound(d)
            | UpstreamError::MetadataUnavailable(d)
            | UpstreamError::PermissionDenied(d)
            | UpstreamError::UpstreamUnavailable(d)
            | UpstreamError::ImageFetchFailed(d)
            | UpstreamError::ClassifierUnavailable(d)
            | UpstreamError::ClassifierUnparseable(d)
            | UpstreamError::ClassifierRejected(d)
            | UpstreamError::Configuration(d) => d.clone(),
        };
        BranchResult::err(self.branch_kind(), detail)
    }
}
