//! Interval-driven batching worker.
//!
//! Producers call [`IntervalWorker::push`]. The first push into an idle worker arms the batch
//! timer; when it fires, one drain takes up to `take_count` items and dispatches them. A drain
//! that leaves items behind re-arms the timer, so sustained load produces a steady cadence of one
//! batch per interval. A drain that empties the queue returns the worker to idle.

use crate::processor::timer::{BatchTimer, TimerHandle};
use crate::processor::worker_pool::{HandoffSender, WorkerPool};
use crate::queue::concurrent::ConcurrentQueue;
use crate::runtime::config::{DispatchMode, WorkerConfig};
use crate::runtime::handler::EventHandler;
use crate::runtime::telemetry::{self, Telemetry};
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// State shared by producers and the drain running on the timer driver.
struct DrainState<T> {
    config: WorkerConfig,
    queue: Arc<ConcurrentQueue<T>>,
    armed: AtomicBool,
    timer: TimerHandle,
    handler: Arc<dyn EventHandler<T>>,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
}

impl<T: Send + Sync + 'static> DrainState<T> {
    fn push(&self, item: T) {
        self.queue.push(item);
        self.telemetry.record_push();

        if !self.armed.swap(true, Ordering::SeqCst) {
            self.timer.arm(self.config.interval());
            self.telemetry.record_arm();
            tracing::debug!(interval = ?self.config.interval(), "batch timer armed");
        }
    }

    async fn drain(&self, handoff: &HandoffSender<T>) {
        let batch = self.queue.take(self.config.take_count());
        if !batch.is_empty() {
            let taken = batch.len();
            let dispatched = match self.config.dispatch_mode() {
                DispatchMode::Pool => self.dispatch_to_pool(batch, handoff).await,
                DispatchMode::Inline => self.dispatch_inline(batch).await,
            };
            self.telemetry.record_drain(dispatched);
            tracing::debug!(taken, dispatched, remaining = self.queue.len(), "drained batch");
        }

        self.settle_timer();
    }

    async fn dispatch_to_pool(&self, batch: Vec<T>, handoff: &HandoffSender<T>) -> usize {
        let mut items = batch.into_iter();
        let mut dispatched = 0;

        for item in items.by_ref() {
            let sent = select! {
                biased;
                _ = self.shutdown.cancelled() => false,
                sent = handoff.send(item) => sent.is_ok(),
            };
            if !sent {
                break;
            }
            dispatched += 1;
        }

        self.record_abandoned(items.len());
        dispatched
    }

    async fn dispatch_inline(&self, batch: Vec<T>) -> usize {
        let mut items = batch.into_iter();
        let mut dispatched = 0;

        for item in items.by_ref() {
            if self.shutdown.is_cancelled() {
                self.record_abandoned(1);
                break;
            }
            self.handler.on_event(item).await;
            self.telemetry.record_handled();
            dispatched += 1;
        }

        self.record_abandoned(items.len());
        dispatched
    }

    fn record_abandoned(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.telemetry.record_dropped_on_close(count);
        tracing::debug!(count, "shutdown interrupted a drain; batch remainder dropped");
    }

    // The flag is released before the emptiness check: a push racing this drain either finds
    // the flag clear and arms the timer itself, or its item is seen here and the timer is reset.
    fn settle_timer(&self) {
        self.armed.store(false, Ordering::SeqCst);

        if self.queue.is_empty() {
            tracing::debug!("queue drained; worker idle");
            return;
        }

        if !self.armed.swap(true, Ordering::SeqCst) {
            self.timer.reset(self.config.interval());
            self.telemetry.record_arm();
            tracing::trace!(queued = self.queue.len(), "batch timer reset");
        }
    }
}

/// Batching dispatcher that drains a concurrent queue on a timer into a pool of consumers.
///
/// Must be created inside a tokio runtime: the pool consumers, the timer driver and the optional
/// metrics reporter are spawned immediately. [`IntervalWorker::push`] is synchronous and may be
/// called from any thread.
///
/// [`IntervalWorker::close`] consumes the worker, so pushing after close or closing twice cannot
/// be expressed. Dropping a worker without closing it cancels its tasks without waiting for them.
pub struct IntervalWorker<T: Send + Sync + 'static> {
    state: Arc<DrainState<T>>,
    shutdown: CancellationToken,
    timer: Option<BatchTimer>,
    pool: Option<WorkerPool>,
    metrics: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> IntervalWorker<T> {
    pub fn new<H>(config: WorkerConfig, handler: H) -> Self
    where
        H: EventHandler<T>,
    {
        Self::with_shared_handler(config, Arc::new(handler))
    }

    /// Same as [`IntervalWorker::new`] for a handler that is already shared.
    pub fn with_shared_handler(config: WorkerConfig, handler: Arc<dyn EventHandler<T>>) -> Self {
        let shutdown = CancellationToken::new();
        let queue = Arc::new(ConcurrentQueue::new());
        let telemetry = Arc::new(Telemetry::default());

        let (pool, handoff) = WorkerPool::launch(
            config.worker_count(),
            handler.clone(),
            telemetry.clone(),
            shutdown.child_token(),
        );

        let metrics = config.metrics_interval().map(|interval| {
            telemetry::spawn_metrics_reporter(
                telemetry.clone(),
                queue.clone(),
                shutdown.child_token(),
                interval,
            )
        });

        let state = Arc::new(DrainState {
            config,
            queue,
            armed: AtomicBool::new(false),
            timer: TimerHandle::new(),
            handler,
            telemetry,
            shutdown: shutdown.clone(),
        });

        let drain_state = state.clone();
        let timer = BatchTimer::spawn(
            state.timer.clone(),
            move || {
                let state = drain_state.clone();
                let handoff = handoff.clone();
                async move { state.drain(&handoff).await }.boxed()
            },
            shutdown.child_token(),
        );

        tracing::info!(
            interval = ?state.config.interval(),
            take_count = state.config.take_count(),
            workers = pool.size(),
            dispatch = ?state.config.dispatch_mode(),
            "interval worker started"
        );

        Self {
            state,
            shutdown,
            timer: Some(timer),
            pool: Some(pool),
            metrics,
        }
    }

    /// Enqueues `item`, arming the batch timer if the worker is idle. Never blocks on the drain.
    pub fn push(&self, item: T) {
        self.state.push(item);
    }

    /// Number of items waiting for a drain.
    pub fn len(&self) -> usize {
        self.state.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.queue.is_empty()
    }

    /// Whether a drain is scheduled or running.
    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.state.config
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.state.telemetry.clone()
    }

    /// Stops the timer, closes the handoff channel, and waits for every pool consumer to exit.
    ///
    /// Handler calls already in flight complete; no handler runs after this returns. Items still
    /// queued are dropped.
    pub async fn close(mut self) {
        self.shutdown.cancel();

        // The timer driver owns the only handoff sender, so joining it closes the channel.
        if let Some(timer) = self.timer.take() {
            timer.shutdown().await;
        }

        if let Some(pool) = self.pool.take() {
            pool.shutdown().await;
        }

        if let Some(handle) = self.metrics.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "metrics reporter task panicked");
            }
        }

        let dropped = self.state.queue.take(usize::MAX).len();
        if dropped > 0 {
            self.state.telemetry.record_dropped_on_close(dropped);
            tracing::warn!(dropped, "interval worker closed with undelivered items");
        }

        tracing::info!("interval worker closed");
    }
}

impl<T: Send + Sync + 'static> Drop for IntervalWorker<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
