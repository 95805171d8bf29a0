use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
}

/// Consecutive-failure tracking for one sink.
///
/// A degraded sink stays in rotation; delivery keeps being attempted and
/// a single success restores it. No backoff, no removal.
#[derive(Debug)]
pub(crate) struct SinkHealth {
    threshold: u32,
    consecutive_failures: AtomicU32,
    degraded: AtomicBool,
}

impl SinkHealth {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: AtomicU32::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> HealthState {
        if self.degraded.load(Ordering::Relaxed) {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        }
    }

    pub fn record_success(&self, sink: &str) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        if self.degraded.swap(false, Ordering::Relaxed) {
            info!(sink, "sink recovered");
        }
    }

    pub fn record_failure(&self, sink: &str) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.threshold && !self.degraded.swap(true, Ordering::Relaxed) {
            warn!(sink, consecutive_failures = failures, "sink marked degraded");
        }
    }
}
