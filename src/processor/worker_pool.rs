//! Fixed-size pool of consumer tasks fed through a bounded handoff channel.
//!
//! Every consumer races the shared cancellation token against the next item. The receiver sits
//! behind an async mutex so that exactly one idle consumer waits on the channel at a time while
//! the others are free to run the handler concurrently.

use crate::runtime::handler::EventHandler;
use crate::runtime::telemetry::Telemetry;
use std::sync::Arc;
use tokio::select;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type HandoffSender<T> = mpsc::Sender<T>;
type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Spawns `worker_count` consumers and returns the pool plus the sending half of the handoff
    /// channel, whose capacity equals the pool size.
    pub fn launch<T>(
        worker_count: usize,
        handler: Arc<dyn EventHandler<T>>,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> (Self, HandoffSender<T>)
    where
        T: Send + 'static,
    {
        debug_assert!(worker_count > 0, "worker_count must be greater than 0");
        let (tx, rx) = mpsc::channel(worker_count);
        let receiver: SharedReceiver<T> = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(consume(
                    worker_id,
                    receiver.clone(),
                    handler.clone(),
                    telemetry.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        tracing::debug!(workers = worker_count, "worker pool started");
        (Self { workers, shutdown }, tx)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Cancels every consumer and waits for all of them to exit.
    ///
    /// A consumer that is running the handler finishes that call first. Consumers that died from
    /// a panicking handler are reported here.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            if let Err(err) = handle.await {
                tracing::warn!(worker = worker_id, error = %err, "pool worker panicked");
            }
        }
    }
}

async fn consume<T: Send + 'static>(
    worker_id: usize,
    receiver: SharedReceiver<T>,
    handler: Arc<dyn EventHandler<T>>,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
) {
    loop {
        let next = select! {
            biased;
            _ = shutdown.cancelled() => None,
            item = recv_next(&receiver) => item,
        };

        let Some(item) = next else {
            break;
        };
        handler.on_event(item).await;
        telemetry.record_handled();
    }

    tracing::trace!(worker = worker_id, "pool worker exiting");
}

async fn recv_next<T>(receiver: &Mutex<mpsc::Receiver<T>>) -> Option<T> {
    receiver.lock().await.recv().await
}
