//! Fan-out from all connections to the configured sinks.
//!
//! Connections synchronize only through the dispatch channel; a single
//! router task serializes fan-out, and each sink gets its own bounded
//! queue drained by its own worker task. A slow or failing sink fills
//! and overflows its own queue without touching the others, and never
//! propagates anything back to the connection that produced a record.
//!
//! Ordering: the dispatch channel preserves per-sender FIFO and the
//! router enqueues to every sink queue in arrival order, so records from
//! one connection reach each sink in send order. Nothing is promised
//! across connections.

mod health;

use crate::config::Settings;
use crate::sink::Sink;
use health::SinkHealth;
use notcat_protocol::{Priority, Record};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use health::HealthState;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Pending records per sink; the oldest is dropped on overflow.
    pub queue_capacity: usize,
    /// Consecutive failures before a sink is marked degraded.
    pub degraded_threshold: u32,
    /// Upper bound on one `accept` call.
    pub accept_timeout: Duration,
    /// Dispatch channel depth shared by all connections.
    pub dispatch_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            degraded_threshold: 3,
            accept_timeout: Duration::from_secs(1),
            dispatch_capacity: 1024,
        }
    }
}

impl RouterConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            degraded_threshold: settings.degraded_threshold,
            accept_timeout: settings.sink_timeout,
            dispatch_capacity: RouterConfig::default().dispatch_capacity,
        }
    }
}

/// Counters and health for one sink, snapshotted for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub name: String,
    pub state: HealthState,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

struct SinkWorker {
    sink: Arc<dyn Sink>,
    min_priority: Option<Priority>,
    capacity: usize,
    queue: Mutex<VecDeque<Arc<Record>>>,
    notify: Notify,
    health: SinkHealth,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl SinkWorker {
    fn new(sink: Arc<dyn Sink>, min_priority: Option<Priority>, config: &RouterConfig) -> Arc<Self> {
        Arc::new(Self {
            sink,
            min_priority,
            capacity: config.queue_capacity,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            health: SinkHealth::new(config.degraded_threshold),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    fn wants(&self, record: &Record) -> bool {
        self.min_priority.is_none_or(|min| record.priority >= min)
    }

    fn enqueue(&self, record: Arc<Record>) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(record);
        drop(queue);
        self.notify.notify_one();
    }

    /// Drain the queue until `drain` is cancelled and the queue is empty.
    async fn run(self: Arc<Self>, accept_timeout: Duration, drain: CancellationToken) {
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                Some(record) => self.deliver(&record, accept_timeout).await,
                None if drain.is_cancelled() => break,
                None => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = drain.cancelled() => {}
                    }
                }
            }
        }
    }

    async fn deliver(&self, record: &Record, accept_timeout: Duration) {
        let degraded = self.health.state() == HealthState::Degraded;
        match tokio::time::timeout(accept_timeout, self.sink.accept(record)).await {
            Ok(Ok(())) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                self.health.record_success(self.sink.name());
            }
            Ok(Err(error)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                debug!(sink = self.sink.name(), %error, degraded, "sink delivery failed");
                self.health.record_failure(self.sink.name());
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    sink = self.sink.name(),
                    timeout_ms = accept_timeout.as_millis() as u64,
                    degraded,
                    "sink delivery timed out"
                );
                self.health.record_failure(self.sink.name());
            }
        }
    }

    fn report(&self) -> SinkReport {
        SinkReport {
            name: self.sink.name().to_string(),
            state: self.health.state(),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

pub struct Router;

impl Router {
    /// Spawn the router task and one worker task per sink.
    pub fn spawn(
        sinks: Vec<(Arc<dyn Sink>, Option<Priority>)>,
        config: RouterConfig,
    ) -> RouterHandle {
        let (tx, mut rx) = mpsc::channel::<Arc<Record>>(config.dispatch_capacity);

        let workers: Vec<Arc<SinkWorker>> = sinks
            .into_iter()
            .map(|(sink, min_priority)| SinkWorker::new(sink, min_priority, &config))
            .collect();

        let drain = CancellationToken::new();
        let worker_tasks: Vec<JoinHandle<()>> = workers
            .iter()
            .map(|worker| {
                tokio::spawn(
                    Arc::clone(worker).run(config.accept_timeout, drain.clone()),
                )
            })
            .collect();

        let fan_out = workers.clone();
        let task = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                for worker in &fan_out {
                    if worker.wants(&record) {
                        worker.enqueue(Arc::clone(&record));
                    }
                }
            }
            drain.cancel();
            for task in worker_tasks {
                if let Err(error) = task.await {
                    warn!(%error, "sink worker task failed");
                }
            }
        });

        RouterHandle { tx, task, workers }
    }
}

/// Owner side of a running router. Dropping every dispatcher clone plus
/// calling [`RouterHandle::shutdown`] drains the queues and stops the
/// workers.
pub struct RouterHandle {
    tx: mpsc::Sender<Arc<Record>>,
    task: JoinHandle<()>,
    workers: Vec<Arc<SinkWorker>>,
}

impl RouterHandle {
    /// Dispatch entry handed to each connection. Safe to use from any
    /// number of tasks; per-sender order is preserved.
    pub fn dispatcher(&self) -> mpsc::Sender<Arc<Record>> {
        self.tx.clone()
    }

    pub fn reports(&self) -> Vec<SinkReport> {
        self.workers.iter().map(|w| w.report()).collect()
    }

    /// Drain remaining records, stop the workers, and log per-sink totals.
    pub async fn shutdown(self) -> Vec<SinkReport> {
        drop(self.tx);
        if let Err(error) = self.task.await {
            warn!(%error, "router task failed");
        }
        let reports: Vec<SinkReport> = self.workers.iter().map(|w| w.report()).collect();
        for report in &reports {
            info!(
                sink = %report.name,
                state = ?report.state,
                delivered = report.delivered,
                failed = report.failed,
                dropped = report.dropped,
                "sink totals"
            );
        }
        reports
    }
}
