//! The verdict cache facade.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use hscroll_models::{Verdict, VideoId};

use crate::memory::MemoryStore;
use crate::redis_store::RedisStore;
use crate::single_flight::{FlightMap, FlightRole};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Calibration constant for the time-saved statistic: one cache hit
/// replaces roughly this much upstream analysis.
const TIME_SAVED_PER_HIT_SECS: u64 = 20;

/// Failure of a `get_or_compute` call.
#[derive(Debug, Error)]
pub enum BuildError<E: std::error::Error> {
    /// This caller was the builder and its build failed.
    #[error(transparent)]
    Build(E),
    /// This caller waited on another builder, which failed.
    #[error("{0}")]
    Shared(String),
}

/// Cache performance counters, exposed for operator visibility.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cache_type: String,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_requests: u64,
    pub hit_rate_percentage: f64,
    pub cached_entries: u64,
    pub cache_sets: u64,
    pub ttl_days: u32,
    pub time_saved_seconds: u64,
    pub persistent: bool,
    pub shared: bool,
}

enum Backend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

/// TTL-bounded verdict cache with per-key single-flight builds.
pub struct VerdictCache {
    backend: Backend,
    flights: FlightMap,
    ttl_days: u32,
}

impl VerdictCache {
    /// Select a backend: the shared Redis store when a URL is configured
    /// and reachable, otherwise the process-local fallback. Never fails;
    /// an unreachable backend degrades to in-memory with a warning.
    pub async fn connect(backend_url: Option<&str>, ttl_days: u32) -> Self {
        if let Some(url) = backend_url {
            match RedisStore::connect(url, u64::from(ttl_days) * SECONDS_PER_DAY).await {
                Ok(store) => {
                    return Self {
                        backend: Backend::Redis(store),
                        flights: FlightMap::new(),
                        ttl_days,
                    };
                }
                Err(e) => {
                    warn!(error = %e, "Redis cache unavailable, falling back to in-memory cache");
                }
            }
        }

        info!(ttl_days, "Using in-memory verdict cache (non-persistent)");
        Self::in_memory(ttl_days)
    }

    /// Process-local cache with the given TTL in days.
    pub fn in_memory(ttl_days: u32) -> Self {
        Self::in_memory_with_ttl(
            Duration::from_secs(u64::from(ttl_days) * SECONDS_PER_DAY),
            ttl_days,
        )
    }

    pub(crate) fn in_memory_with_ttl(ttl: Duration, ttl_days: u32) -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::new(ttl)),
            flights: FlightMap::new(),
            ttl_days,
        }
    }

    /// Look up a non-expired verdict.
    pub async fn get(&self, id: &VideoId) -> Option<Verdict> {
        match &self.backend {
            Backend::Redis(store) => store.get(id).await,
            Backend::Memory(store) => store.get(id),
        }
    }

    async fn peek(&self, id: &VideoId) -> Option<Verdict> {
        match &self.backend {
            Backend::Redis(store) => store.peek(id).await,
            Backend::Memory(store) => store.peek(id),
        }
    }

    /// Store a verdict under the cache TTL.
    pub async fn put(&self, id: &VideoId, verdict: &Verdict) {
        match &self.backend {
            Backend::Redis(store) => store.put(id, verdict).await,
            Backend::Memory(store) => store.put(id, verdict),
        }
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, id: &VideoId) {
        match &self.backend {
            Backend::Redis(store) => store.invalidate(id).await,
            Backend::Memory(store) => store.invalidate(id),
        }
    }

    /// Drop all entries; returns the number removed.
    pub async fn clear(&self) -> u64 {
        match &self.backend {
            Backend::Redis(store) => store.clear().await.unwrap_or_else(|e| {
                warn!(error = %e, "Redis cache clear failed");
                0
            }),
            Backend::Memory(store) => store.clear(),
        }
    }

    /// Current cache counters.
    pub async fn stats(&self) -> CacheStats {
        let (cache_type, persistent, shared, (hits, misses, sets), entries) = match &self.backend {
            Backend::Redis(store) => (
                "Redis (persistent)",
                true,
                true,
                store.counters().await.unwrap_or((0, 0, 0)),
                store.entry_count().await.unwrap_or(0),
            ),
            Backend::Memory(store) => (
                "In-memory (non-persistent)",
                false,
                false,
                store.counters(),
                store.entry_count(),
            ),
        };

        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };

        CacheStats {
            cache_type: cache_type.to_string(),
            cache_hits: hits,
            cache_misses: misses,
            total_requests: total,
            hit_rate_percentage: hit_rate,
            cached_entries: entries,
            cache_sets: sets,
            ttl_days: self.ttl_days,
            time_saved_seconds: hits * TIME_SAVED_PER_HIT_SECS,
            persistent,
            shared,
        }
    }

    /// Return the cached verdict for `id`, or run `build` to produce and
    /// store one. At most one build runs per key at a time in this
    /// process; concurrent callers wait for the builder and receive its
    /// result. A failed build is never cached; waiters observe the
    /// failure and the next caller becomes a fresh builder.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        id: &VideoId,
        build: F,
    ) -> Result<Verdict, BuildError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Verdict, E>>,
        E: std::error::Error,
    {
        let guard = loop {
            match self.flights.join(id.as_str()) {
                FlightRole::Leader(guard) => break guard,
                FlightRole::Follower(mut rx) => match rx.recv().await {
                    Ok(Ok(verdict)) => return Ok(verdict),
                    Ok(Err(detail)) => return Err(BuildError::Shared(detail)),
                    // Builder vanished without publishing; re-enter election.
                    Err(_closed) => continue,
                },
            }
        };

        // Re-check under single-flight discipline: another builder may have
        // stored a verdict between the caller's lookup and our election.
        if let Some(verdict) = self.peek(id).await {
            guard.complete(Ok(verdict.clone()));
            return Ok(verdict);
        }

        match build().await {
            Ok(verdict) => {
                self.put(id, &verdict).await;
                guard.complete(Ok(verdict.clone()));
                Ok(verdict)
            }
            Err(e) => {
                guard.complete(Err(e.to_string()));
                Err(BuildError::Build(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use hscroll_models::{combine_verdict, BranchResult, CaptionSource, VideoMetadata};

    use super::*;

    #[derive(Debug, Error)]
    #[error("build failed: {0}")]
    struct TestBuildError(String);

    fn test_verdict(id: &str) -> Verdict {
        let meta = VideoMetadata {
            video_id: VideoId::from_validated(id),
            title: "title".into(),
            channel_title: "channel".into(),
            thumbnail_url: "thumb".into(),
            caption_text: "captions".into(),
            caption_source: CaptionSource::Manual,
        };
        combine_verdict(
            &BranchResult::ok(true, "fine"),
            &BranchResult::ok(true, "fine"),
            &meta,
        )
    }

    #[tokio::test]
    async fn get_or_compute_stores_and_returns() {
        let cache = VerdictCache::in_memory(7);
        let id = VideoId::from_validated("aaaaaaaaaaa");

        let built = cache
            .get_or_compute(&id, || async { Ok::<_, TestBuildError>(test_verdict("aaaaaaaaaaa")) })
            .await
            .unwrap();

        assert_eq!(cache.get(&id).await, Some(built));
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = VerdictCache::in_memory_with_ttl(Duration::from_millis(10), 7);
        let id = VideoId::from_validated("aaaaaaaaaaa");
        cache.put(&id, &test_verdict("aaaaaaaaaaa")).await;

        assert!(cache.get(&id).await.is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get(&id).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_flight_invokes_build_exactly_once() {
        let cache = Arc::new(VerdictCache::in_memory(7));
        let id = VideoId::from_validated("aaaaaaaaaaa");
        let builds = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let cache = Arc::clone(&cache);
            let id = id.clone();
            let builds = Arc::clone(&builds);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&id, || async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, TestBuildError>(test_verdict("aaaaaaaaaaa"))
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1, "build must run once");
        let first = &results[0];
        assert!(results.iter().all(|v| v == first));
    }

    #[tokio::test]
    async fn failed_build_is_not_cached() {
        let cache = VerdictCache::in_memory(7);
        let id = VideoId::from_validated("aaaaaaaaaaa");
        let builds = AtomicU32::new(0);

        let first = cache
            .get_or_compute(&id, || async {
                builds.fetch_add(1, Ordering::SeqCst);
                Err::<Verdict, _>(TestBuildError("upstream down".into()))
            })
            .await;
        assert!(matches!(first, Err(BuildError::Build(_))));
        assert!(cache.get(&id).await.is_none());

        // Next caller becomes a fresh builder.
        let second = cache
            .get_or_compute(&id, || async {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestBuildError>(test_verdict("aaaaaaaaaaa"))
            })
            .await;
        assert!(second.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiters_observe_the_builders_failure() {
        let cache = Arc::new(VerdictCache::in_memory(7));
        let id = VideoId::from_validated("aaaaaaaaaaa");

        let leader = {
            let cache = Arc::clone(&cache);
            let id = id.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(&id, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err::<Verdict, _>(TestBuildError("quota exceeded".into()))
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        let follower = cache
            .get_or_compute(&id, || async {
                panic!("follower must not build while a flight is active")
            })
            .await;

        match follower {
            Err(BuildError::<TestBuildError>::Shared(detail)) => {
                assert!(detail.contains("quota exceeded"));
            }
            other => panic!("expected shared failure, got {other:?}"),
        }
        assert!(matches!(leader.await.unwrap(), Err(BuildError::Build(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_builder_hands_off_to_a_waiter() {
        let cache = Arc::new(VerdictCache::in_memory(7));
        let id = VideoId::from_validated("aaaaaaaaaaa");

        let stalled = {
            let cache = Arc::clone(&cache);
            let id = id.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(&id, || std::future::pending::<Result<Verdict, TestBuildError>>())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = {
            let cache = Arc::clone(&cache);
            let id = id.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(&id, || async {
                        Ok::<_, TestBuildError>(test_verdict("aaaaaaaaaaa"))
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        stalled.abort();
        let verdict = waiter.await.unwrap().unwrap();
        assert_eq!(verdict, test_verdict("aaaaaaaaaaa"));
    }

    #[tokio::test]
    async fn stats_track_hits_misses_and_time_saved() {
        let cache = VerdictCache::in_memory(7);
        let id = VideoId::from_validated("aaaaaaaaaaa");

        assert!(cache.get(&id).await.is_none());
        cache.put(&id, &test_verdict("aaaaaaaaaaa")).await;
        assert!(cache.get(&id).await.is_some());
        assert!(cache.get(&id).await.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_sets, 1);
        assert_eq!(stats.cached_entries, 1);
        assert_eq!(stats.time_saved_seconds, 2 * TIME_SAVED_PER_HIT_SECS);
        assert!((stats.hit_rate_percentage - 66.67).abs() < 0.01);
        assert!(!stats.persistent);
    }

    #[tokio::test]
    async fn clear_reports_removed_entries() {
        let cache = VerdictCache::in_memory(7);
        cache
            .put(&VideoId::from_validated("aaaaaaaaaaa"), &test_verdict("aaaaaaaaaaa"))
            .await;
        cache
            .put(&VideoId::from_validated("bbbbbbbbbbb"), &test_verdict("bbbbbbbbbbb"))
            .await;

        assert_eq!(cache.clear().await, 2);
        assert_eq!(cache.stats().await.cached_entries, 0);
    }
}
