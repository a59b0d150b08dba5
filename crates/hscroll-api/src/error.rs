//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use hscroll_upstream::UpstreamError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Daily analysis budget exhausted ({count_today}/{limit})")]
    BudgetExhausted { limit: u32, count_today: u32 },

    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    /// A concurrent builder for the same video failed; this caller only
    /// observed the failure detail.
    #[error("Verdict build failed: {0}")]
    BuildFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BudgetExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) | ApiError::BuildFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match &self {
            ApiError::BudgetExhausted { limit, count_today } => json!({
                "error": "Daily limit exceeded",
                "message": "The service has reached its daily limit for new video analysis. Please try again tomorrow.",
                "limit": limit,
                "count_today": count_today,
                "info": "Cached videos do not count toward the limit; previously analyzed videos are still served.",
            }),
            // Don't expose internal error details in production
            ApiError::Upstream(_) | ApiError::BuildFailed(_) | ApiError::Internal(_) => {
                let message = if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                };
                json!(message)
            }
            _ => json!(self.to_string()),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
