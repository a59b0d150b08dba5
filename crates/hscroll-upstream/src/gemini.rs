//! Text policy classifier client (Gemini).
//!
//! Submits caption text plus title and channel under a fixed policy prompt
//! and parses the VERDICT/EXPLANATION response. The rule set enumerated in
//! the prompt is the product's policy contract and is not configurable.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hscroll_models::{truncate_reason, BranchResult, VideoMetadata};

use crate::error::{UpstreamError, UpstreamResult};
use crate::TranscriptAnalyzer;

/// Models tried in order; a transport failure falls through to the next.
const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
];

/// Responses asserting uncertainty without a verdict keyword are treated
/// as unsafe rather than unparseable.
const HEDGE_MARKERS: &[&str] = &["UNCERTAIN", "UNSURE", "UNCLEAR", "NOT SURE", "CANNOT DETERMINE"];

/// Configuration for the policy classifier client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Gemini API key.
    pub api_key: String,
    /// API base URL.
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Client for the text policy classifier.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Create a new policy classifier client.
    pub fn new(config: GeminiConfig) -> UpstreamResult<Self> {
        if config.api_key.is_empty() {
            return Err(UpstreamError::configuration("GEMINI_API_KEY not set"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::configuration(format!("HTTP client build failed: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> UpstreamResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    /// Judge the caption text; returns the safe bit and the justification.
    pub async fn analyze_transcript(&self, meta: &VideoMetadata) -> UpstreamResult<(bool, String)> {
        let prompt = build_prompt(&meta.caption_text, &meta.title, &meta.channel_title);

        let mut last_error = None;
        for model in FALLBACK_MODELS {
            match self.call_api(model, &prompt).await {
                Ok(text) => {
                    info!(model, "Transcript analysis response received");
                    return parse_verdict(&text);
                }
                Err(e) => {
                    warn!(model, error = %e, "Policy classifier attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            UpstreamError::ClassifierUnavailable("all classifier models failed".to_string())
        }))
    }

    async fn call_api(&self, model: &str, prompt: &str) -> UpstreamResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "text/plain".to_string(),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::ClassifierUnavailable(format!("classifier request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() && status.as_u16() != 429 {
                UpstreamError::ClassifierRejected(format!("classifier returned {status}: {body}"))
            } else {
                UpstreamError::ClassifierUnavailable(format!("classifier returned {status}"))
            });
        }

        let generate: GenerateResponse = response.json().await.map_err(|e| {
            UpstreamError::ClassifierUnavailable(format!("malformed classifier response: {e}"))
        })?;

        generate
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| {
                UpstreamError::ClassifierUnparseable("empty classifier response".to_string())
            })
    }
}

impl TranscriptAnalyzer for GeminiClient {
    async fn analyze(&self, meta: &VideoMetadata) -> BranchResult {
        match self.analyze_transcript(meta).await {
            Ok((safe, reason)) => BranchResult::ok(safe, reason),
            Err(e) => e.into_branch_result(),
        }
    }
}

/// The fixed policy prompt. The enumerated rule set is a stable product
/// contract; changing it changes what the product means by "safe".
fn build_prompt(caption_text: &str, title: &str, channel: &str) -> String {
    format!(
        r#"You are a content moderator reviewing short-form video content for young children, following strict family-safety norms.

VIDEO TITLE: {title}
CHANNEL: {channel}

TRANSCRIPT:
{caption_text}

STRICT SAFETY RULES (ANY violation means UNSAFE):
1. Nudity - any form (partial, full, artistic, medical, accidental, cartoon)
2. Sexual content - any references (innuendo, jokes, gestures, educational)
3. Racism - any form (jokes, stereotypes, slurs, casual references)
4. Discrimination - based on religion, caste, gender, region, or color
5. Violence - physical harm, weapons, blood, fighting, bullying
6. Abusive language - swear words, profanity, insults, derogatory terms
7. Drugs or alcohol - any reference, joke, or depiction
8. Scary content - horror, gore, disturbing imagery
9. Inappropriate gestures - offensive hand signs, provocative movements
10. Adult themes - dating, romance, intimate situations
11. Dangerous acts - stunts or risky behavior children might copy
12. Religious insensitivity - mocking any faith or belief

Content is SAFE only if it is educational or family-friendly entertainment, carries positive messages, and has no questionable elements whatsoever. When in doubt, mark it UNSAFE. It is better to be over-cautious than to risk exposing children to inappropriate content.

Respond EXACTLY in this format:
VERDICT: [SAFE or UNSAFE]
EXPLANATION: [short justification for your decision]"#
    )
}

/// Parse the classifier's response into the safe bit and reason.
///
/// The verdict keyword is searched on the VERDICT line first, then in the
/// whole response. UNSAFE is checked before SAFE because the latter is a
/// substring of the former. A response that hedges without a keyword is
/// unsafe; a response with neither is unparseable.
fn parse_verdict(text: &str) -> UpstreamResult<(bool, String)> {
    let text = text.trim();
    let reason = truncate_reason(extract_explanation(text).unwrap_or_else(|| text.to_string()));

    let from_verdict_line = text
        .lines()
        .find(|line| line_has_prefix(line, "VERDICT"))
        .and_then(keyword_verdict);
    if let Some(safe) = from_verdict_line.or_else(|| keyword_verdict(text)) {
        return Ok((safe, reason));
    }

    let upper = text.to_uppercase();
    if HEDGE_MARKERS.iter().any(|marker| upper.contains(marker)) {
        return Ok((false, reason));
    }

    Err(UpstreamError::ClassifierUnparseable(
        "no recognizable verdict keyword in classifier response".to_string(),
    ))
}

/// The verdict keyword in a piece of text, if any. UNSAFE wins over SAFE
/// so a line like "not UNSAFE" still fails closed.
fn keyword_verdict(text: &str) -> Option<bool> {
    if contains_keyword(text, "UNSAFE") {
        Some(false)
    } else if contains_keyword(text, "SAFE") {
        Some(true)
    } else {
        None
    }
}

/// Text after `EXPLANATION:` through the end of the response.
fn extract_explanation(text: &str) -> Option<String> {
    let mut lines = text.lines();
    let mut explanation = loop {
        let line = lines.next()?;
        let trimmed = line.trim_start();
        if let Some(rest) = strip_prefix_ignore_case(trimmed, "EXPLANATION:") {
            break rest.trim().to_string();
        }
    };

    for line in lines {
        let line = line.trim();
        if !line.is_empty() {
            explanation.push(' ');
            explanation.push_str(line);
        }
    }

    if explanation.is_empty() {
        None
    } else {
        Some(explanation)
    }
}

fn line_has_prefix(line: &str, prefix: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Case-insensitive whole-word search (ASCII word boundaries).
fn contains_keyword(text: &str, keyword: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut start = 0;

    while let Some(pos) = upper[start..].find(keyword) {
        let begin = start + pos;
        let end = begin + keyword.len();
        let before_ok = begin == 0 || !bytes[begin - 1].is_ascii_alphanumeric();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}
