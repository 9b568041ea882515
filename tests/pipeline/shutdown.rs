use std::time::Duration;

use anyhow::Result;
use interval_worker::{DispatchMode, IntervalWorker, WorkerConfig};
use tokio::time::{sleep, timeout};

use crate::support::helpers::{init_tracing, wait_for_len, RecordingHandler};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_before_first_drain_delivers_nothing() -> Result<()> {
    init_tracing();
    let handler = RecordingHandler::new();
    let config = WorkerConfig::builder()
        .interval(Duration::from_millis(50))
        .worker_count(2)
        .build()?;
    let worker = IntervalWorker::new(config, handler.clone());
    for item in 0..10u32 {
        worker.push(item);
    }
    let telemetry = worker.telemetry();

    timeout(Duration::from_secs(1), worker.close()).await?;
    sleep(Duration::from_millis(120)).await;

    assert!(handler.seen().is_empty());
    assert_eq!(telemetry.snapshot().dropped_on_close, 10);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn no_handler_runs_after_close_returns() -> Result<()> {
    for mode in [DispatchMode::Pool, DispatchMode::Inline] {
        init_tracing();
        let handler = RecordingHandler::with_delay(Duration::from_millis(30));
        let config = WorkerConfig::builder()
            .interval(Duration::from_millis(5))
            .take_count(2)
            .worker_count(2)
            .dispatch_mode(mode)
            .build()?;
        let worker = IntervalWorker::new(config, handler.clone());
        for item in 0..20u32 {
            worker.push(item);
        }

        wait_for_len(&handler, 1, Duration::from_secs(2)).await?;
        timeout(Duration::from_secs(2), worker.close()).await?;

        let at_close = handler.len();
        assert!(at_close < 20, "{mode:?}: close should leave work undone");
        sleep(Duration::from_millis(100)).await;
        assert_eq!(handler.len(), at_close, "{mode:?}: handler ran after close");
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_handler_does_not_block_close() -> Result<()> {
    init_tracing();
    let config = WorkerConfig::builder()
        .interval(Duration::from_millis(5))
        .build()?;
    let worker = IntervalWorker::new(config, |item: u32| {
        if item == 0 {
            panic!("handler rejected item {item}");
        }
    });
    worker.push(0);
    sleep(Duration::from_millis(50)).await;

    timeout(Duration::from_secs(1), worker.close()).await?;
    Ok(())
}
