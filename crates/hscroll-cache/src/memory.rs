//! Process-local fallback cache.
//!
//! A mutex-guarded map with explicit per-entry expiry, swept on access.
//! Does not survive restarts and is not shared across processes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use hscroll_models::{Verdict, VideoId};

struct CacheEntry {
    verdict: Verdict,
    expires_at: Instant,
}

/// In-memory verdict store.
pub(crate) struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl MemoryStore {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
        }
    }

    pub(crate) fn get(&self, id: &VideoId) -> Option<Verdict> {
        let verdict = self.lookup(id);
        match &verdict {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        verdict
    }

    /// Like `get` but without touching the hit/miss counters. Used by the
    /// single-flight re-check so one build does not count as two misses.
    pub(crate) fn peek(&self, id: &VideoId) -> Option<Verdict> {
        self.lookup(id)
    }

    fn lookup(&self, id: &VideoId) -> Option<Verdict> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(id.as_str()) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.verdict.clone()),
            Some(_) => {
                entries.remove(id.as_str());
                None
            }
            None => None,
        }
    }

    pub(crate) fn put(&self, id: &VideoId, verdict: &Verdict) {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            id.as_str().to_string(),
            CacheEntry {
                verdict: verdict.clone(),
                expires_at: now + self.ttl,
            },
        );
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn invalidate(&self, id: &VideoId) {
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .remove(id.as_str());
    }

    pub(crate) fn clear(&self) -> u64 {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        let count = entries.len() as u64;
        entries.clear();
        count
    }

    pub(crate) fn entry_count(&self) -> u64 {
        self.entries.lock().expect("cache mutex poisoned").len() as u64
    }

    pub(crate) fn counters(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.sets.load(Ordering::Relaxed),
        )
    }
}
