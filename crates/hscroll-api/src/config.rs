//! API configuration.

use std::time::Duration;

use hscroll_models::Likelihood;

/// API server configuration. Read once at startup; immutable afterwards.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Per-IP transport rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Outer request timeout
    pub request_timeout: Duration,
    /// Daily budget for new (cache-missing) analyses
    pub global_daily_limit: u32,
    /// Verdict cache TTL in days
    pub cache_ttl_days: u32,
    /// Shared cache backend URL; presence selects the Redis backend
    pub cache_backend_url: Option<String>,
    /// Likelihood threshold for the thumbnail classifier
    pub image_safety_threshold: Likelihood,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(60),
            global_daily_limit: 150,
            cache_ttl_days: 7,
            cache_backend_url: None,
            image_safety_threshold: Likelihood::Possible,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            global_daily_limit: std::env::var("GLOBAL_DAILY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(150),
            cache_ttl_days: std::env::var("CACHE_TTL_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(7),
            cache_backend_url: std::env::var("CACHE_BACKEND_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            image_safety_threshold: std::env::var("IMAGE_SAFETY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Likelihood::Possible),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
