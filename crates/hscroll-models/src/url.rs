//! Video URL parsing and id extraction.
//!
//! Accepts the platform's canonical hosts and short-link host and extracts
//! the 11-character video id from the known URL shapes. All normalization
//! happens here; the rest of the service only ever sees [`VideoId`]s.

use thiserror::Error;

use crate::video::VideoId;

/// Video ids are exactly 11 characters.
const VIDEO_ID_LEN: usize = 11;

/// Errors that can occur during video id extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The URL is not on a recognized video host.
    #[error("InvalidUrl: not a recognized video URL (expected youtube.com or youtu.be)")]
    InvalidUrl,
    /// The host was recognized but no well-formed video id was found.
    #[error("UnextractableId: could not extract a valid video id from the URL")]
    UnextractableId,
}

/// Extract the canonical video id from a URL.
///
/// Supported shapes:
/// - `https://www.youtube.com/watch?v=VIDEO_ID`
/// - `https://youtu.be/VIDEO_ID`
/// - `https://www.youtube.com/shorts/VIDEO_ID`
/// - `https://www.youtube.com/embed/VIDEO_ID`
/// - `https://www.youtube.com/v/VIDEO_ID`
///
/// Scheme, `www.`, host casing, query ordering, fragments and trailing
/// parameters are all discarded.
pub fn extract_video_id(url: &str) -> Result<VideoId, UrlError> {
    let url = url.trim();

    if !is_recognized_host(url) {
        return Err(UrlError::InvalidUrl);
    }

    let candidates = [
        extract_from_watch(url),
        extract_from_short_link(url),
        extract_from_path_shape(url, "/shorts/"),
        extract_from_path_shape(url, "/embed/"),
        extract_from_path_shape(url, "/v/"),
    ];

    for candidate in candidates.into_iter().flatten() {
        if is_valid_id(&candidate) {
            return Ok(VideoId::from_validated(candidate));
        }
    }

    Err(UrlError::UnextractableId)
}

/// Check whether the URL is on one of the platform's hosts.
fn is_recognized_host(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

/// `watch?v=VIDEO_ID`; the id may appear as the first or a later query
/// parameter.
fn extract_from_watch(url: &str) -> Option<String> {
    let pos = url.find("?v=").or_else(|| url.find("&v="))?;
    Some(leading_id_segment(&url[pos + 3..]))
}

/// `youtu.be/VIDEO_ID`
fn extract_from_short_link(url: &str) -> Option<String> {
    let lower = url.to_ascii_lowercase();
    let pos = lower.find("youtu.be/")?;
    let rest = &url[pos + "youtu.be/".len()..];
    if rest.is_empty() {
        return None;
    }
    Some(leading_id_segment(rest))
}

/// `<marker>VIDEO_ID` path shapes (`/shorts/`, `/embed/`, `/v/`).
fn extract_from_path_shape(url: &str, marker: &str) -> Option<String> {
    let pos = url.find(marker)?;
    let rest = &url[pos + marker.len()..];
    if rest.is_empty() {
        return None;
    }
    Some(leading_id_segment(rest))
}

/// Take characters up to the next URL delimiter.
fn leading_id_segment(s: &str) -> String {
    let end = s
        .find(|c| matches!(c, '&' | '#' | '?' | '/'))
        .unwrap_or(s.len());
    s[..end].trim().to_string()
}

/// Ids are exactly 11 characters from `[A-Za-z0-9_-]`.
fn is_valid_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> String {
        extract_video_id(url).unwrap().as_str().to_string()
    }

    #[test]
    fn extracts_from_all_shapes() {
        assert_eq!(id("https://youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(
            id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(
            id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(id("https://youtube.com/embed/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(id("https://youtube.com/v/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn url_variants_canonicalize_identically() {
        let canonical = id("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let variants = [
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://YOUTUBE.COM/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?list=PLx&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=30",
            "https://youtu.be/dQw4w9WgXcQ#fragment",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ/",
            "  https://youtube.com/watch?v=dQw4w9WgXcQ  ",
        ];
        for v in variants {
            assert_eq!(id(v), canonical, "variant {v} did not canonicalize");
        }
    }

    #[test]
    fn rejects_unrecognized_hosts() {
        for url in ["not a url", "https://example.com", "https://vimeo.com/123"] {
            assert_eq!(extract_video_id(url), Err(UrlError::InvalidUrl));
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        let cases = [
            "https://youtube.com",
            "https://youtu.be/",
            "https://youtube.com/watch?v=",
            "https://youtube.com/watch?v=short",
            "https://youtu.be/waaaaaaay-too-long-id",
            "https://youtube.com/watch?v=bad!chars!!",
        ];
        for url in cases {
            assert_eq!(
                extract_video_id(url),
                Err(UrlError::UnextractableId),
                "expected UnextractableId for {url}"
            );
        }
    }

    #[test]
    fn ids_may_contain_underscore_and_hyphen() {
        assert_eq!(id("https://youtu.be/a_b-c_d-e_f"), "a_b-c_d-e_f");
    }
}
