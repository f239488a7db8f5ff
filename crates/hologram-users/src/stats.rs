//! Named counters and timings.
//!
//! The server and the cache report what they do through a [`Stats`]
//! implementation chosen by the embedder. Nothing in Hologram depends on
//! a particular metrics backend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Sink for named counters and timings.
pub trait Stats: Send + Sync + 'static {
    /// Adds `value` to the counter called `name`.
    fn counter(&self, name: &str, value: u64);

    /// Records how long the operation called `name` took.
    fn timing(&self, name: &str, elapsed: Duration) {
        let _ = (name, elapsed);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStats;

impl Stats for NoopStats {
    fn counter(&self, _name: &str, _value: u64) {}
}

/// Emits every stat as a `tracing` event under the `hologram::stats`
/// target, so a subscriber can route them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStats;

impl Stats for TracingStats {
    fn counter(&self, name: &str, value: u64) {
        tracing::debug!(target: "hologram::stats", stat = name, value, "counter");
    }

    fn timing(&self, name: &str, elapsed: Duration) {
        tracing::debug!(
            target: "hologram::stats",
            stat = name,
            elapsed_ms = elapsed.as_millis() as u64,
            "timing"
        );
    }
}

/// Keeps counter totals in memory. Useful in tests and for a quick look
/// at a running process.
#[derive(Debug, Default)]
pub struct MemoryStats {
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current total of a counter; 0 if it was never incremented.
    pub fn get(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.get(name).copied().unwrap_or(0)
    }
}

impl Stats for MemoryStats {
    fn counter(&self, name: &str, value: u64) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        *counters.entry(name.to_string()).or_insert(0) += value;
    }
}
