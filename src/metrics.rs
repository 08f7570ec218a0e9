//! Lock-free atomic metrics for the passthrough context.
//!
//! Grounded on `turbomcp-proxy`'s `proxy::metrics` module: atomics over a
//! mutex since the counters are updated from many concurrent inbound tasks
//! and only ever read as an eventually-consistent snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters tracking passthrough context activity.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    /// Requests that completed with a `continue{response}` outcome.
    pub requests_forwarded: AtomicU64,
    /// Requests that ended in `abort{error}`.
    pub requests_aborted: AtomicU64,
    /// Requests a hook short-circuited with `respond` (the target was
    /// never called).
    pub requests_short_circuited: AtomicU64,
    /// `continueAsync` continuations started.
    pub async_continuations_started: AtomicU64,
    /// `continueAsync` continuations whose callback fired with a response.
    pub async_continuations_succeeded: AtomicU64,
    /// `continueAsync` continuations whose callback fired with an error.
    pub async_continuations_failed: AtomicU64,
    /// Notifications dropped because a hook's handler errored.
    pub notifications_dropped: AtomicU64,
}

impl AtomicMetrics {
    /// A fresh set of zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a consistent-enough snapshot for reporting.
    ///
    /// Not a single atomic read of all fields together — under concurrent
    /// updates the snapshot can reflect counters from slightly different
    /// instants — but each individual counter is read atomically.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_forwarded: self.requests_forwarded.load(Ordering::Relaxed),
            requests_aborted: self.requests_aborted.load(Ordering::Relaxed),
            requests_short_circuited: self.requests_short_circuited.load(Ordering::Relaxed),
            async_continuations_started: self.async_continuations_started.load(Ordering::Relaxed),
            async_continuations_succeeded: self
                .async_continuations_succeeded
                .load(Ordering::Relaxed),
            async_continuations_failed: self.async_continuations_failed.load(Ordering::Relaxed),
            notifications_dropped: self.notifications_dropped.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of [`AtomicMetrics`], suitable for serialization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// See [`AtomicMetrics::requests_forwarded`].
    pub requests_forwarded: u64,
    /// See [`AtomicMetrics::requests_aborted`].
    pub requests_aborted: u64,
    /// See [`AtomicMetrics::requests_short_circuited`].
    pub requests_short_circuited: u64,
    /// See [`AtomicMetrics::async_continuations_started`].
    pub async_continuations_started: u64,
    /// See [`AtomicMetrics::async_continuations_succeeded`].
    pub async_continuations_succeeded: u64,
    /// See [`AtomicMetrics::async_continuations_failed`].
    pub async_continuations_failed: u64,
    /// See [`AtomicMetrics::notifications_dropped`].
    pub notifications_dropped: u64,
}
