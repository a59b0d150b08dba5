//! Video identity and metadata models.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical identifier for a video on the platform.
///
/// Produced only by [`crate::url::extract_video_id`]; two URL variants
/// referring to the same video always yield byte-identical ids. The id is
/// the sole cache key for verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an already-validated identifier.
    ///
    /// Callers outside the extractor should prefer
    /// [`crate::url::extract_video_id`].
    pub fn from_validated(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which tier of the caption fallback chain produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionSource {
    /// Manually authored caption track.
    Manual,
    /// Auto-generated (ASR) caption track.
    AutoGenerated,
    /// No usable track; text is the video description plus tag list.
    DescriptionFallback,
}

impl CaptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionSource::Manual => "manual",
            CaptionSource::AutoGenerated => "auto-generated",
            CaptionSource::DescriptionFallback => "description-fallback",
        }
    }
}

impl fmt::Display for CaptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable metadata for one video, valid for the lifetime of a request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Canonical video id.
    pub video_id: VideoId,
    /// Video title.
    pub title: String,
    /// Channel name.
    pub channel_title: String,
    /// Best available thumbnail URL (maxres, falling back to hq).
    pub thumbnail_url: String,
    /// Caption text, timing marks and markup stripped. May be empty.
    pub caption_text: String,
    /// Which fallback tier produced `caption_text`.
    pub caption_source: CaptionSource,
}
