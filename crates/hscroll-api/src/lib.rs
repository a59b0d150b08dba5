//! Axum HTTP API server for the HappyScroll verdict service.
//!
//! This crate provides:
//! - The verdict orchestrator and daily analysis budget
//! - The HTTP surface (verdict, cache admin, health)
//! - Per-IP rate limiting, CORS for extension origins
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{DailyBudget, VerdictService};
pub use state::{AppState, ProdState};
