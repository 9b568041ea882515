use crate::queue::concurrent::ConcurrentQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Filter used when `RUST_LOG` is unset: this crate at `info`, everything else at `warn`.
pub const DEFAULT_LOG_DIRECTIVE: &str = "warn,interval_worker=info";

/// Installs a global fmt subscriber for processes that have not set one up themselves.
///
/// `RUST_LOG` takes precedence over [`DEFAULT_LOG_DIRECTIVE`]. Only the first call has an effect.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .try_init();
    });
}

/// Rolling counters for one worker.
#[derive(Default, Debug)]
pub struct Telemetry {
    pushed: AtomicU64,
    arms: AtomicU64,
    drains: AtomicU64,
    dispatched: AtomicU64,
    handled: AtomicU64,
    dropped_on_close: AtomicU64,
}

impl Telemetry {
    pub fn record_push(&self) {
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one transition of the batch timer from disarmed to armed.
    pub fn record_arm(&self) {
        self.arms.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one drain that dispatched `batch` items.
    pub fn record_drain(&self, batch: usize) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.dispatched.fetch_add(batch as u64, Ordering::Relaxed);
    }

    pub fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_on_close(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.dropped_on_close
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            arms: self.arms.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            dropped_on_close: self.dropped_on_close.load(Ordering::Relaxed),
        }
    }

    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    pub fn arms(&self) -> u64 {
        self.arms.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub pushed: u64,
    pub arms: u64,
    pub drains: u64,
    pub dispatched: u64,
    pub handled: u64,
    pub dropped_on_close: u64,
}

/// Spawns a background task that periodically logs push/handle throughput and queue depth.
pub fn spawn_metrics_reporter<T: Send + Sync + 'static>(
    telemetry: Arc<Telemetry>,
    queue: Arc<ConcurrentQueue<T>>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(target: "interval_worker::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current = telemetry.snapshot();
                    let handled_delta = current.handled.saturating_sub(last_snapshot.handled);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        handled_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "interval_worker::metrics",
                        throughput = format!("{throughput:.2}"),
                        pushed = current.pushed,
                        arms = current.arms,
                        drains = current.drains,
                        dispatched = current.dispatched,
                        handled = current.handled,
                        queued = queue.len(),
                        "worker metrics snapshot"
                    );

                    last_snapshot = current;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
