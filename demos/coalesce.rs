//! Coalesces a burst of small writes into periodic bulk flushes.
//!
//! Configuration is read from `INTERVAL_WORKER_*` environment variables; `COALESCE_WRITES` sets
//! the size of the burst. Stops once every write is flushed, or on Ctrl-C.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use interval_worker::{EventFuture, EventHandler, IntervalWorker, WorkerConfig};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const DEFAULT_WRITES: usize = 40;
const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[derive(Debug, Clone)]
struct PendingWrite {
    key: String,
    pushed_at: Instant,
}

struct BulkSink {
    flushed: Arc<AtomicUsize>,
}

impl EventHandler<PendingWrite> for BulkSink {
    fn on_event(&self, write: PendingWrite) -> EventFuture<'_> {
        Box::pin(async move {
            // Stand-in for a downstream bulk call.
            sleep(Duration::from_millis(15)).await;
            let total = self.flushed.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!(
                key = %write.key,
                waited_ms = write.pushed_at.elapsed().as_millis() as u64,
                total,
                "write flushed"
            );
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_demo_tracing();

    let writes = read_env_or_default("COALESCE_WRITES", DEFAULT_WRITES)?;
    let config = WorkerConfig::from_env().context("failed to read worker configuration")?;
    tracing::info!(?config, writes, "starting coalesce demo");

    let flushed = Arc::new(AtomicUsize::new(0));
    let worker = IntervalWorker::new(
        config,
        BulkSink {
            flushed: flushed.clone(),
        },
    );

    for index in 0..writes {
        worker.push(PendingWrite {
            key: format!("row-{index:04}"),
            pushed_at: Instant::now(),
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received; closing worker");
        }
        _ = wait_for_flush(&flushed, writes) => {
            tracing::info!("all writes flushed");
        }
    }

    let telemetry = worker.telemetry();
    worker.close().await;
    tracing::info!(summary = ?telemetry.snapshot(), "coalesce demo finished");
    Ok(())
}

async fn wait_for_flush(flushed: &AtomicUsize, expected: usize) {
    while flushed.load(Ordering::SeqCst) < expected {
        sleep(Duration::from_millis(20)).await;
    }
}

fn init_demo_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn read_env_or_default(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value `{value}` for {key}")),
        _ => Ok(default),
    }
}
