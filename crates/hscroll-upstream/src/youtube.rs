//! Video platform data API client.
//!
//! Fetches snippet metadata (title, channel, thumbnails) and caption text
//! for a video id. Captions follow a fixed fallback chain: manual English,
//! auto-generated English, manual in any language, auto in any language,
//! and finally the video description concatenated with the tag list.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use hscroll_models::{CaptionSource, VideoId, VideoMetadata};

use crate::error::{UpstreamError, UpstreamResult};
use crate::MetadataProvider;

/// Configuration for the data API client.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    /// Data API key.
    pub api_key: String,
    /// Data API base URL.
    pub base_url: String,
    /// Public timedtext endpoint for caption bodies.
    pub timedtext_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timedtext_url: "https://www.youtube.com/api/timedtext".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl YouTubeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("YOUTUBE_API_KEY").unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Client for the video platform's data API.
pub struct YouTubeClient {
    http: Client,
    config: YouTubeConfig,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CaptionListResponse {
    #[serde(default)]
    items: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    snippet: CaptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionSnippet {
    #[serde(default)]
    language: String,
    #[serde(default)]
    track_kind: String,
}

impl YouTubeClient {
    /// Create a new data API client.
    pub fn new(config: YouTubeConfig) -> UpstreamResult<Self> {
        if config.api_key.is_empty() {
            return Err(UpstreamError::configuration("YOUTUBE_API_KEY not set"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> UpstreamResult<Self> {
        Self::new(YouTubeConfig::from_env())
    }

    /// Fetch metadata and caption text for a video.
    pub async fn fetch_metadata(&self, id: &VideoId) -> UpstreamResult<VideoMetadata> {
        let snippet = self.fetch_snippet(id).await?;

        let thumbnail_url = best_thumbnail(&snippet.thumbnails).ok_or_else(|| {
            UpstreamError::metadata_unavailable(format!("no usable thumbnail for video {id}"))
        })?;

        let (caption_text, caption_source) = self.fetch_captions(id, &snippet).await;

        info!(
            video_id = %id,
            title = %snippet.title,
            caption_source = %caption_source,
            caption_chars = caption_text.len(),
            "Fetched video metadata"
        );

        Ok(VideoMetadata {
            video_id: id.clone(),
            title: snippet.title,
            channel_title: snippet.channel_title,
            thumbnail_url,
            caption_text,
            caption_source,
        })
    }

    async fn fetch_snippet(&self, id: &VideoId) -> UpstreamResult<Snippet> {
        let url = format!("{}/videos", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("id", id.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("metadata request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_data_api_error(status, &body));
        }

        let mut listing: VideoListResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("malformed metadata response: {e}")))?;

        if listing.items.is_empty() {
            return Err(UpstreamError::video_not_found(format!("video {id} not found")));
        }
        Ok(listing.items.remove(0).snippet)
    }

    /// Walk the caption fallback chain; never fails. Any listing or
    /// download problem drops through to the description fallback.
    async fn fetch_captions(&self, id: &VideoId, snippet: &Snippet) -> (String, CaptionSource) {
        match self.list_caption_tracks(id).await {
            Ok(tracks) => {
                for (track, source) in ranked_caption_tracks(&tracks) {
                    match self.download_timedtext(id, &track.snippet.language).await {
                        Ok(text) if !text.trim().is_empty() => {
                            debug!(
                                video_id = %id,
                                language = %track.snippet.language,
                                source = %source,
                                "Using caption track"
                            );
                            return (text, source);
                        }
                        Ok(_) => {
                            debug!(video_id = %id, language = %track.snippet.language, "Empty caption body");
                        }
                        Err(e) => {
                            warn!(video_id = %id, language = %track.snippet.language, error = %e, "Caption download failed");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(video_id = %id, error = %e, "Caption listing failed");
            }
        }

        debug!(video_id = %id, "No usable caption track, falling back to description");
        (
            description_fallback(&snippet.description, &snippet.tags),
            CaptionSource::DescriptionFallback,
        )
    }

    async fn list_caption_tracks(&self, id: &VideoId) -> UpstreamResult<Vec<CaptionTrack>> {
        let url = format!("{}/captions", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", id.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("caption listing failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_data_api_error(status, &body));
        }

        let listing: CaptionListResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("malformed caption listing: {e}")))?;
        Ok(listing.items)
    }

    /// Download one caption track as WebVTT and strip it to plain text.
    ///
    /// The official caption download endpoint requires OAuth, so this uses
    /// the public timedtext endpoint instead.
    async fn download_timedtext(&self, id: &VideoId, language: &str) -> UpstreamResult<String> {
        let response = self
            .http
            .get(&self.config.timedtext_url)
            .query(&[("v", id.as_str()), ("lang", language), ("fmt", "vtt")])
            .send()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("timedtext request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(UpstreamError::unavailable(format!(
                "timedtext returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("timedtext body read failed: {e}")))?;
        Ok(strip_vtt(&body))
    }
}

impl MetadataProvider for YouTubeClient {
    async fn fetch(&self, id: &VideoId) -> UpstreamResult<VideoMetadata> {
        self.fetch_metadata(id).await
    }
}

/// Thumbnails in quality-descending order; the first the platform reports
/// as available wins.
fn best_thumbnail(thumbnails: &HashMap<String, Thumbnail>) -> Option<String> {
    ["maxres", "high"]
        .iter()
        .find_map(|quality| thumbnails.get(*quality).map(|t| t.url.clone()))
}

/// Caption tracks in preference order: manual English, auto English,
/// manual in any language, auto in any language.
fn ranked_caption_tracks(tracks: &[CaptionTrack]) -> Vec<(&CaptionTrack, CaptionSource)> {
    let mut ranked: Vec<(&CaptionTrack, CaptionSource, u8)> = tracks
        .iter()
        .map(|track| {
            let manual = track.snippet.track_kind != "asr";
            let english = is_english(&track.snippet.language);
            let source = if manual {
                CaptionSource::Manual
            } else {
                CaptionSource::AutoGenerated
            };
            let tier = match (english, manual) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            };
            (track, source, tier)
        })
        .collect();

    ranked.sort_by_key(|(_, _, tier)| *tier);
    ranked
        .into_iter()
        .map(|(track, source, _)| (track, source))
        .collect()
}

fn is_english(language: &str) -> bool {
    language == "en" || language.starts_with("en-")
}

/// Tier 5 of the caption chain: description plus tag list.
fn description_fallback(description: &str, tags: &[String]) -> String {
    let mut text = description.trim().to_string();
    if !tags.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&tags.join(", "));
    }
    text
}

/// Strip a WebVTT document to plain caption text: headers, cue timings,
/// cue numbers and markup are removed.
fn strip_vtt(content: &str) -> String {
    let mut parts = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("WEBVTT")
            || line.contains("-->")
            || line.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        let clean = strip_markup(line);
        if !clean.is_empty() {
            parts.push(clean);
        }
    }
    parts.join(" ")
}

/// Remove `<...>` markup from a caption line.
fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn map_data_api_error(status: StatusCode, body: &str) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED => {
            UpstreamError::PermissionDenied("data API rejected the credential".to_string())
        }
        StatusCode::FORBIDDEN => {
            if body.contains("quota") {
                UpstreamError::unavailable("data API quota exceeded")
            } else {
                UpstreamError::PermissionDenied("data API access forbidden".to_string())
            }
        }
        StatusCode::NOT_FOUND => UpstreamError::video_not_found("data API returned 404"),
        status => UpstreamError::unavailable(format!("data API returned {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(language: &str, kind: &str) -> CaptionTrack {
        CaptionTrack {
            snippet: CaptionSnippet {
                language: language.to_string(),
                track_kind: kind.to_string(),
            },
        }
    }

    #[test]
    fn thumbnail_prefers_maxres_then_high() {
        let mut thumbs = HashMap::new();
        thumbs.insert("high".to_string(), Thumbnail { url: "hq.jpg".into() });
        assert_eq!(best_thumbnail(&thumbs), Some("hq.jpg".into()));

        thumbs.insert(
            "maxres".to_string(),
            Thumbnail {
                url: "maxres.jpg".into(),
            },
        );
        assert_eq!(best_thumbnail(&thumbs), Some("maxres.jpg".into()));

        let only_default: HashMap<String, Thumbnail> = [(
            "default".to_string(),
            Thumbnail {
                url: "default.jpg".into(),
            },
        )]
        .into();
        assert_eq!(best_thumbnail(&only_default), None);
    }

    #[test]
    fn caption_tiers_prefer_manual_english() {
        let tracks = vec![
            track("fr", "asr"),
            track("fr", "standard"),
            track("en", "asr"),
            track("en", "standard"),
        ];
        let ranked = ranked_caption_tracks(&tracks);

        assert_eq!(ranked[0].0.snippet.language, "en");
        assert_eq!(ranked[0].1, CaptionSource::Manual);
        assert_eq!(ranked[1].0.snippet.language, "en");
        assert_eq!(ranked[1].1, CaptionSource::AutoGenerated);
        assert_eq!(ranked[2].0.snippet.language, "fr");
        assert_eq!(ranked[2].1, CaptionSource::Manual);
        assert_eq!(ranked[3].1, CaptionSource::AutoGenerated);
    }

    #[test]
    fn regional_english_counts_as_english() {
        let tracks = vec![track("de", "standard"), track("en-GB", "standard")];
        let ranked = ranked_caption_tracks(&tracks);
        assert_eq!(ranked[0].0.snippet.language, "en-GB");
    }

    #[test]
    fn strip_vtt_removes_headers_timings_and_markup() {
        let vtt = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nHello <b>world</b>\n\n2\n00:00:02.000 --> 00:00:03.000\n<c.color>Another</c> line\n";
        assert_eq!(strip_vtt(vtt), "Hello world Another line");
    }

    #[test]
    fn strip_vtt_of_empty_document_is_empty() {
        assert_eq!(strip_vtt("WEBVTT\n\n"), "");
    }

    #[test]
    fn description_fallback_concatenates_tags() {
        assert_eq!(
            description_fallback("A video.", &["kids".into(), "fun".into()]),
            "A video.\nkids, fun"
        );
        assert_eq!(description_fallback("", &[]), "");
        assert_eq!(description_fallback("", &["solo".into()]), "solo");
    }

    #[test]
    fn data_api_errors_map_to_taxonomy() {
        assert!(matches!(
            map_data_api_error(StatusCode::UNAUTHORIZED, ""),
            UpstreamError::PermissionDenied(_)
        ));
        assert!(matches!(
            map_data_api_error(StatusCode::FORBIDDEN, "quotaExceeded"),
            UpstreamError::UpstreamUnavailable(_)
        ));
        assert!(matches!(
            map_data_api_error(StatusCode::FORBIDDEN, "forbidden"),
            UpstreamError::PermissionDenied(_)
        ));
        assert!(matches!(
            map_data_api_error(StatusCode::NOT_FOUND, ""),
            UpstreamError::VideoNotFound(_)
        ));
        assert!(matches!(
            map_data_api_error(StatusCode::BAD_GATEWAY, ""),
            UpstreamError::UpstreamUnavailable(_)
        ));
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let config = YouTubeConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            YouTubeClient::new(config),
            Err(UpstreamError::Configuration(_))
        ));
    }
}
