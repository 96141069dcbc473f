//! REST polling fallback.
//!
//! Runs only while the push connection is not `Connected`. The connection
//! manager starts and stops it on every state transition; both calls are
//! idempotent.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::history::HistorySync;
use crate::metrics::RealtimeMetrics;

/// Periodic latest-page poller.
#[derive(Debug)]
pub struct PollingFallback {
    interval: Duration,
    sync: Arc<HistorySync>,
    metrics: Arc<RealtimeMetrics>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingFallback {
    /// Create a stopped poller ticking every `interval`.
    pub fn new(interval: Duration, sync: Arc<HistorySync>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            interval,
            sync,
            metrics,
            task: Mutex::new(None),
        }
    }

    /// Whether the poll loop is running.
    pub fn is_active(&self) -> bool {
        self.task.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Start polling. The first tick fires one interval from now.
    pub fn start(&self) {
        let mut slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }
        let period = self.interval;
        let sync = self.sync.clone();
        let metrics = self.metrics.clone();
        let first_tick = Instant::now() + period;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                metrics.inc_poll();
                let added = sync.poll_latest().await;
                debug!(added, "Polling tick");
            }
        }));
        info!(interval_secs = period.as_secs(), "Polling fallback started");
    }

    /// Stop polling. No-op when not running.
    pub fn stop(&self) {
        let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        handle.abort();
        info!("Polling fallback stopped");
    }
}

impl Drop for PollingFallback {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}
