//! Branch results, the combined verdict, and the combiner.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::{VideoId, VideoMetadata};

/// Maximum length of any reason string carried in a verdict.
pub const MAX_REASON_LEN: usize = 600;

/// Classifier-side failure categories a branch can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BranchErrorKind {
    /// The classifier could not fetch the image it was asked to judge.
    ImageFetchFailed,
    /// Network, quota or server-side failure of the classifier.
    ClassifierUnavailable,
    /// The classifier responded but no verdict could be parsed.
    ClassifierUnparseable,
    /// The classifier rejected the request.
    ClassifierRejected,
}

impl fmt::Display for BranchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BranchErrorKind::ImageFetchFailed => "ImageFetchFailed",
            BranchErrorKind::ClassifierUnavailable => "ClassifierUnavailable",
            BranchErrorKind::ClassifierUnparseable => "ClassifierUnparseable",
            BranchErrorKind::ClassifierRejected => "ClassifierRejected",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one analysis branch (transcript or thumbnail).
///
/// A tagged sum rather than null-with-out-of-band-error, so the combiner
/// is a total function over the four (ok/err x ok/err) cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchResult {
    Ok { safe: bool, reason: String },
    Err { kind: BranchErrorKind, detail: String },
}

impl BranchResult {
    pub fn ok(safe: bool, reason: impl Into<String>) -> Self {
        BranchResult::Ok {
            safe,
            reason: truncate_reason(reason.into()),
        }
    }

    pub fn err(kind: BranchErrorKind, detail: impl Into<String>) -> Self {
        BranchResult::Err {
            kind,
            detail: truncate_reason(detail.into()),
        }
    }

    /// True only for a successful `safe=true` outcome; errors are unsafe.
    pub fn is_safe(&self) -> bool {
        matches!(self, BranchResult::Ok { safe: true, .. })
    }

    /// The reason string, or the error detail for failed branches.
    pub fn reason(&self) -> String {
        match self {
            BranchResult::Ok { reason, .. } => reason.clone(),
            BranchResult::Err { kind, detail } => format!("{kind}: {detail}"),
        }
    }
}

/// The cached, returned safety verdict for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    /// Canonical video id the verdict applies to.
    pub video_id: VideoId,
    /// Overall verdict: true only if both branches are safe.
    pub is_safe: bool,
    /// Whether the transcript branch judged the video safe.
    pub is_safe_transcript: bool,
    /// Whether the thumbnail branch judged the video safe.
    pub is_safe_thumbnail: bool,
    /// Reason from the transcript branch (or its error detail).
    pub transcript_reason: String,
    /// Reason from the thumbnail branch (or its error detail).
    pub thumbnail_reason: String,
    /// Composed human-readable explanation of the overall verdict.
    pub overall_reason: String,
    /// Video title from the platform.
    pub video_title: String,
    /// Channel name from the platform.
    pub channel_title: String,
}

/// Truncate a reason string to [`MAX_REASON_LEN`] on a char boundary.
pub fn truncate_reason(mut s: String) -> String {
    if s.len() <= MAX_REASON_LEN {
        return s;
    }
    let mut end = MAX_REASON_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s.push_str("...");
    s
}

/// Merge the two branch results and the video metadata into a verdict.
///
/// Fail-closed: a branch error counts the same as that branch saying
/// "not safe".
pub fn combine_verdict(
    transcript: &BranchResult,
    thumbnail: &BranchResult,
    meta: &VideoMetadata,
) -> Verdict {
    let is_safe_transcript = transcript.is_safe();
    let is_safe_thumbnail = thumbnail.is_safe();
    let is_safe = is_safe_transcript && is_safe_thumbnail;

    let overall_reason = match (is_safe_transcript, is_safe_thumbnail) {
        (true, true) => {
            "SAFE: Both transcript and thumbnail are appropriate for children.".to_string()
        }
        (false, false) => "UNSAFE: Both transcript and thumbnail contain inappropriate content. \
                           Video should be blocked."
            .to_string(),
        (false, true) => "UNSAFE: Transcript contains inappropriate content. \
                          Video should be blocked despite safe thumbnail."
            .to_string(),
        (true, false) => "UNSAFE: Thumbnail contains inappropriate imagery. \
                          Video should be blocked despite safe transcript."
            .to_string(),
    };

    Verdict {
        video_id: meta.video_id.clone(),
        is_safe,
        is_safe_transcript,
        is_safe_thumbnail,
        transcript_reason: truncate_reason(transcript.reason()),
        thumbnail_reason: truncate_reason(thumbnail.reason()),
        overall_reason,
        video_title: meta.title.clone(),
        channel_title: meta.channel_title.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::CaptionSource;

    fn meta() -> VideoMetadata {
        VideoMetadata {
            video_id: VideoId::from_validated("aaaaaaaaaaa"),
            title: "A".to_string(),
            channel_title: "B".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/aaaaaaaaaaa/maxresdefault.jpg".to_string(),
            caption_text: "hello".to_string(),
            caption_source: CaptionSource::Manual,
        }
    }

    #[test]
    fn both_safe_yields_safe() {
        let v = combine_verdict(
            &BranchResult::ok(true, "Content is educational."),
            &BranchResult::ok(true, "No inappropriate content detected."),
            &meta(),
        );
        assert!(v.is_safe);
        assert!(v.is_safe_transcript);
        assert!(v.is_safe_thumbnail);
        assert!(v.overall_reason.starts_with("SAFE"));
        assert_eq!(v.video_title, "A");
        assert_eq!(v.channel_title, "B");
    }

    #[test]
    fn transcript_unsafe_dominates() {
        let v = combine_verdict(
            &BranchResult::ok(false, "Contains profanity."),
            &BranchResult::ok(true, "Thumbnail is safe."),
            &meta(),
        );
        assert!(!v.is_safe);
        assert!(!v.is_safe_transcript);
        assert!(v.is_safe_thumbnail);
        assert!(v.transcript_reason.contains("profanity"));
        assert!(v.overall_reason.contains("Transcript"));
    }

    #[test]
    fn thumbnail_unsafe_dominates() {
        let v = combine_verdict(
            &BranchResult::ok(true, "Fine."),
            &BranchResult::ok(false, "Detected: adult, racy."),
            &meta(),
        );
        assert!(!v.is_safe);
        assert!(v.is_safe_transcript);
        assert!(!v.is_safe_thumbnail);
        assert!(v.overall_reason.contains("Thumbnail"));
    }

    #[test]
    fn branch_error_is_unsafe() {
        let v = combine_verdict(
            &BranchResult::err(BranchErrorKind::ClassifierUnavailable, "quota exceeded"),
            &BranchResult::ok(true, "Fine."),
            &meta(),
        );
        assert!(!v.is_safe);
        assert!(!v.is_safe_transcript);
        assert!(v.transcript_reason.contains("ClassifierUnavailable"));
        assert!(v.transcript_reason.contains("quota exceeded"));
    }

    #[test]
    fn both_err_yields_both_unsafe_wording() {
        let v = combine_verdict(
            &BranchResult::err(BranchErrorKind::ClassifierUnparseable, "no verdict"),
            &BranchResult::err(BranchErrorKind::ImageFetchFailed, "404"),
            &meta(),
        );
        assert!(!v.is_safe);
        assert!(v.overall_reason.contains("Both"));
    }

    #[test]
    fn is_safe_is_conjunction_of_branches() {
        for (t, i) in [(true, true), (true, false), (false, true), (false, false)] {
            let v = combine_verdict(
                &BranchResult::ok(t, "t"),
                &BranchResult::ok(i, "i"),
                &meta(),
            );
            assert_eq!(v.is_safe, t && i);
        }
    }

    #[test]
    fn long_reasons_are_truncated() {
        let long = "x".repeat(MAX_REASON_LEN * 2);
        let v = combine_verdict(
            &BranchResult::ok(true, long.clone()),
            &BranchResult::ok(true, long),
            &meta(),
        );
        assert!(v.transcript_reason.len() <= MAX_REASON_LEN + 3);
        assert!(v.transcript_reason.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "\u{1F600}".repeat(MAX_REASON_LEN);
        let out = truncate_reason(long);
        assert!(out.len() <= MAX_REASON_LEN + 3);
    }

    #[test]
    fn verdict_round_trips_through_json() {
        let v = combine_verdict(
            &BranchResult::ok(true, "ok"),
            &BranchResult::ok(true, "ok"),
            &meta(),
        );
        let json = serde_json::to_string(&v).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
