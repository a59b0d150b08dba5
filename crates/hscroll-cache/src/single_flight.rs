//! Per-key build coordination.
//!
//! At most one builder runs per key at a time within a process. The map
//! from key to completion channel is guarded by a mutex; the builder
//! removes its key before publishing, and waiters never hold the lock
//! while awaiting the result.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use hscroll_models::Verdict;

/// What waiters receive: the built verdict, or the builder's failure
/// rendered as a detail string.
pub(crate) type FlightResult = Result<Verdict, String>;

/// Outcome of joining the in-flight map for a key.
pub(crate) enum FlightRole<'a> {
    /// This caller was elected builder and must eventually call
    /// [`FlightGuard::complete`].
    Leader(FlightGuard<'a>),
    /// Another caller is building; await its published result.
    Follower(broadcast::Receiver<FlightResult>),
}

/// Map of in-flight builds, one completion channel per key.
#[derive(Default)]
pub(crate) struct FlightMap {
    inflight: Mutex<HashMap<String, broadcast::Sender<FlightResult>>>,
}

impl FlightMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`: become the builder if none is running,
    /// otherwise subscribe to the running builder's completion.
    pub(crate) fn join(&self, key: &str) -> FlightRole<'_> {
        let mut inflight = self.inflight.lock().expect("flight map mutex poisoned");
        if let Some(tx) = inflight.get(key) {
            return FlightRole::Follower(tx.subscribe());
        }

        let (tx, _rx) = broadcast::channel(1);
        inflight.insert(key.to_string(), tx.clone());
        FlightRole::Leader(FlightGuard {
            map: self,
            key: key.to_string(),
            tx: Some(tx),
        })
    }

    fn remove(&self, key: &str) {
        self.inflight
            .lock()
            .expect("flight map mutex poisoned")
            .remove(key);
    }
}

/// Held by the elected builder. Completing publishes the result to all
/// waiters; dropping without completing (builder cancelled) removes the
/// key and closes the channel, sending waiters back into election.
pub(crate) struct FlightGuard<'a> {
    map: &'a FlightMap,
    key: String,
    tx: Option<broadcast::Sender<FlightResult>>,
}

impl FlightGuard<'_> {
    /// Publish the build outcome. The key is removed before sending so
    /// late arrivals elect a fresh builder (and, on success, find the
    /// stored entry first).
    pub(crate) fn complete(mut self, result: FlightResult) {
        self.map.remove(&self.key);
        if let Some(tx) = self.tx.take() {
            // No receivers just means nobody waited.
            let _ = tx.send(result);
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.map.remove(&self.key);
        }
    }
}
