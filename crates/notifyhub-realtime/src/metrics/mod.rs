//! Delivery metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Delivery counters shared by the connection manager and polling loop.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Hub connect attempts, initial and retries
    pub connect_attempts: AtomicU64,
    /// Attempts that failed to open
    pub connect_failures: AtomicU64,
    /// Successful connects after a drop
    pub reconnects: AtomicU64,
    /// Notifications received over push
    pub pushes_received: AtomicU64,
    /// Polling ticks run
    pub polls_run: AtomicU64,
    /// Full history resyncs
    pub resyncs: AtomicU64,
}

impl RealtimeMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_push(&self) {
        self.pushes_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_poll(&self) {
        self.polls_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_resync(&self) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            pushes_received: self.pushes_received.load(Ordering::Relaxed),
            polls_run: self.polls_run.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub connect_attempts: u64,
    pub connect_failures: u64,
    pub reconnects: u64,
    pub pushes_received: u64,
    pub polls_run: u64,
    pub resyncs: u64,
}
