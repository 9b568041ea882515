use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use interval_worker::{DispatchMode, IntervalWorker, WorkerConfig};

use crate::support::helpers::{init_tracing, wait_for_len, RecordingHandler};

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 250;

async fn run_concurrent_producers(mode: DispatchMode) -> Result<()> {
    init_tracing();
    let handler = RecordingHandler::new();
    let config = WorkerConfig::builder()
        .interval(Duration::from_millis(5))
        .take_count(64)
        .worker_count(4)
        .dispatch_mode(mode)
        .build()?;
    let worker = Arc::new(IntervalWorker::new(config, handler.clone()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let worker = worker.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    worker.push((producer, seq));
                    if seq % 50 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer thread should not panic");
    }

    let total = PRODUCERS * PER_PRODUCER;
    wait_for_len(&handler, total, Duration::from_secs(10)).await?;

    let seen = handler.seen();
    assert_eq!(seen.len(), total, "every push must be handled exactly once");
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique.len(), total);

    let worker = Arc::try_unwrap(worker)
        .unwrap_or_else(|_| panic!("producers should have released the worker"));
    assert!(worker.is_empty());
    worker.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_through_pool() -> Result<()> {
    run_concurrent_producers(DispatchMode::Pool).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_inline() -> Result<()> {
    run_concurrent_producers(DispatchMode::Inline).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_dispatch_runs_handlers_concurrently() -> Result<()> {
    init_tracing();
    let handler = RecordingHandler::with_delay(Duration::from_millis(100));
    let config = WorkerConfig::builder()
        .interval(Duration::from_millis(5))
        .take_count(4)
        .worker_count(4)
        .build()?;
    let worker = IntervalWorker::new(config, handler.clone());

    let started = tokio::time::Instant::now();
    for item in 0..4u32 {
        worker.push(item);
    }
    wait_for_len(&handler, 4, Duration::from_secs(5)).await?;

    // Sequential handling would take at least 400ms.
    assert!(
        started.elapsed() < Duration::from_millis(350),
        "pool should overlap handler calls, took {:?}",
        started.elapsed()
    );
    worker.close().await;
    Ok(())
}
