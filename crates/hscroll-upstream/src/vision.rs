//! Image-safety classifier client (SafeSearch).
//!
//! Submits the thumbnail by URL and maps the category likelihoods to a
//! branch verdict. Only the sensitive categories (adult, violence, racy)
//! force a failure; medical and spoof are reported as detail.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hscroll_models::{BranchResult, Likelihood};

use crate::error::{UpstreamError, UpstreamResult};
use crate::ThumbnailAnalyzer;

/// Configuration for the SafeSearch client.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Vision API key.
    pub api_key: String,
    /// Annotate endpoint base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Likelihood at or above which a sensitive category flags the image.
    pub threshold: Likelihood,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://vision.googleapis.com/v1".to_string(),
            timeout: Duration::from_secs(30),
            threshold: Likelihood::Possible,
        }
    }
}

impl VisionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let threshold = std::env::var("IMAGE_SAFETY_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Likelihood::Possible);
        Self {
            api_key: std::env::var("VISION_API_KEY").unwrap_or_default(),
            threshold,
            ..Default::default()
        }
    }
}

/// Client for the image-safety classifier.
pub struct VisionClient {
    http: Client,
    config: VisionConfig,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageSource,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageSource {
    source: SourceUri,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceUri {
    image_uri: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    safe_search_annotation: Option<SafeSearchAnnotation>,
    error: Option<AnnotateError>,
}

#[derive(Debug, Deserialize)]
struct AnnotateError {
    #[serde(default)]
    message: String,
}

/// Category likelihoods reported by the classifier.
#[derive(Debug, Default, Deserialize)]
pub struct SafeSearchAnnotation {
    #[serde(default)]
    pub adult: Likelihood,
    #[serde(default)]
    pub spoof: Likelihood,
    #[serde(default)]
    pub medical: Likelihood,
    #[serde(default)]
    pub violence: Likelihood,
    #[serde(default)]
    pub racy: Likelihood,
}

impl VisionClient {
    /// Create a new SafeSearch client.
    pub fn new(config: VisionConfig) -> UpstreamResult<Self> {
        if config.api_key.is_empty() {
            return Err(UpstreamError::configuration("VISION_API_KEY not set"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::configuration(format!("HTTP client build failed: {e}")))?;

        info!(threshold = %config.threshold, "SafeSearch client initialized");
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> UpstreamResult<Self> {
        Self::new(VisionConfig::from_env())
    }

    /// Run SafeSearch over the image at `thumbnail_url`.
    pub async fn safe_search(&self, thumbnail_url: &str) -> UpstreamResult<SafeSearchAnnotation> {
        let url = format!(
            "{}/images:annotate?key={}",
            self.config.base_url, self.config.api_key
        );
        let request = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageSource {
                    source: SourceUri {
                        image_uri: thumbnail_url.to_string(),
                    },
                },
                features: vec![Feature {
                    feature_type: "SAFE_SEARCH_DETECTION",
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::ClassifierUnavailable(format!("annotate request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() && status.as_u16() != 429 {
                UpstreamError::ClassifierRejected(format!("annotate returned {status}: {body}"))
            } else {
                UpstreamError::ClassifierUnavailable(format!("annotate returned {status}"))
            });
        }

        let mut annotate: AnnotateResponse = response.json().await.map_err(|e| {
            UpstreamError::ClassifierUnavailable(format!("malformed annotate response: {e}"))
        })?;

        if annotate.responses.is_empty() {
            return Err(UpstreamError::ClassifierRejected(
                "annotate response contained no results".to_string(),
            ));
        }
        let result = annotate.responses.remove(0);

        // Per-image errors on a URL-sourced SafeSearch request are image
        // fetch problems (the classifier could not retrieve the bytes).
        if let Some(error) = result.error {
            return Err(UpstreamError::ImageFetchFailed(error.message));
        }

        result.safe_search_annotation.ok_or_else(|| {
            UpstreamError::ClassifierRejected("no SafeSearch annotation in response".to_string())
        })
    }
}

impl ThumbnailAnalyzer for VisionClient {
    async fn analyze(&self, thumbnail_url: &str) -> BranchResult {
        match self.safe_search(thumbnail_url).await {
            Ok(annotation) => {
                let (safe, reason) = judge(&annotation, self.config.threshold);
                debug!(thumbnail_url, safe, "Thumbnail analysis complete");
                BranchResult::ok(safe, reason)
            }
            Err(e) => e.into_branch_result(),
        }
    }
}

/// Compare each category against the threshold and compose the verdict.
///
/// Sensitive categories (adult, violence, racy) at or above the threshold
/// force `safe=false`; medical and spoof are appended as detail only.
fn judge(annotation: &SafeSearchAnnotation, threshold: Likelihood) -> (bool, String) {
    let flagged: Vec<&str> = [
        ("adult", annotation.adult),
        ("violence", annotation.violence),
        ("racy", annotation.racy),
    ]
    .iter()
    .filter(|(_, likelihood)| *likelihood >= threshold)
    .map(|(name, _)| *name)
    .collect();

    let advisory: Vec<String> = [
        ("medical", annotation.medical),
        ("spoof", annotation.spoof),
    ]
    .iter()
    .filter(|(_, likelihood)| *likelihood >= threshold)
    .map(|(name, likelihood)| format!("{name}={likelihood}"))
    .collect();

    let mut reason = if flagged.is_empty() {
        "Thumbnail is safe. No inappropriate content detected.".to_string()
    } else {
        format!(
            "Thumbnail flagged as UNSAFE. Detected: {}.",
            flagged.join(", ")
        )
    };
    if !advisory.is_empty() {
        reason.push_str(&format!(" Informational: {}.", advisory.join(", ")));
    }

    (flagged.is_empty(), reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(
        adult: Likelihood,
        violence: Likelihood,
        racy: Likelihood,
        medical: Likelihood,
        spoof: Likelihood,
    ) -> SafeSearchAnnotation {
        SafeSearchAnnotation {
            adult,
            violence,
            racy,
            medical,
            spoof,
        }
    }

    #[test]
    fn all_unlikely_is_safe() {
        let a = annotation(
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
            Likelihood::Unlikely,
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
        );
        let (safe, reason) = judge(&a, Likelihood::Possible);
        assert!(safe);
        assert!(reason.contains("safe"));
    }

    #[test]
    fn sensitive_categories_at_threshold_flag_the_image() {
        let a = annotation(
            Likelihood::Likely,
            Likelihood::VeryUnlikely,
            Likelihood::Possible,
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
        );
        let (safe, reason) = judge(&a, Likelihood::Possible);
        assert!(!safe);
        assert!(reason.contains("adult"));
        assert!(reason.contains("racy"));
        assert!(!reason.contains("violence"));
    }

    #[test]
    fn medical_and_spoof_do_not_force_failure() {
        let a = annotation(
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
            Likelihood::VeryLikely,
            Likelihood::Likely,
        );
        let (safe, reason) = judge(&a, Likelihood::Possible);
        assert!(safe, "medical/spoof alone must not flag the image");
        assert!(reason.contains("medical=VERY_LIKELY"));
        assert!(reason.contains("spoof=LIKELY"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let a = annotation(
            Likelihood::Possible,
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
            Likelihood::VeryUnlikely,
        );
        let (safe, _) = judge(&a, Likelihood::Possible);
        assert!(!safe);

        let (safe, _) = judge(&a, Likelihood::Likely);
        assert!(safe, "below a raised threshold the image passes");
    }

    #[test]
    fn unknown_likelihood_never_flags() {
        let a = annotation(
            Likelihood::Unknown,
            Likelihood::Unknown,
            Likelihood::Unknown,
            Likelihood::Unknown,
            Likelihood::Unknown,
        );
        let (safe, _) = judge(&a, Likelihood::VeryUnlikely);
        assert!(safe);
    }

    #[test]
    fn annotation_deserializes_from_wire_form() {
        let json = r#"{
            "adult": "VERY_UNLIKELY",
            "spoof": "POSSIBLE",
            "medical": "UNLIKELY",
            "violence": "LIKELY",
            "racy": "VERY_LIKELY"
        }"#;
        let a: SafeSearchAnnotation = serde_json::from_str(json).unwrap();
        assert_eq!(a.violence, Likelihood::Likely);
        assert_eq!(a.racy, Likelihood::VeryLikely);
    }

    #[test]
    fn missing_categories_default_to_unknown() {
        let a: SafeSearchAnnotation = serde_json::from_str("{}").unwrap();
        assert_eq!(a.adult, Likelihood::Unknown);
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        assert!(matches!(
            VisionClient::new(VisionConfig::default()),
            Err(UpstreamError::Configuration(_))
        ));
    }
}
