//! HTTP handlers.

pub mod cache_admin;
pub mod health;
pub mod verdict;

pub use cache_admin::{clear_cache, get_cache_statistics};
pub use health::health;
pub use verdict::get_video_verdict;
