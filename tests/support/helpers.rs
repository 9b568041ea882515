use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use interval_worker::{EventFuture, EventHandler};
use once_cell::sync::Lazy;
use tokio::time::{sleep, Instant};
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Handler that appends every item it sees, optionally pausing inside each call.
#[derive(Clone)]
pub struct RecordingHandler<T> {
    seen: Arc<Mutex<Vec<T>>>,
    delay: Option<Duration>,
}

impl<T: Clone + Send + 'static> RecordingHandler<T> {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn seen(&self) -> Vec<T> {
        self.seen.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl<T: Clone + Send + Sync + 'static> EventHandler<T> for RecordingHandler<T> {
    fn on_event(&self, item: T) -> EventFuture<'_> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                sleep(delay).await;
            }
            self.seen.lock().unwrap().push(item);
        })
    }
}

/// Polls until `handler` has recorded `expected` items or `limit` elapses.
pub async fn wait_for_len<T: Clone + Send + 'static>(
    handler: &RecordingHandler<T>,
    expected: usize,
    limit: Duration,
) -> Result<()> {
    let deadline = Instant::now() + limit;
    loop {
        let current = handler.len();
        if current >= expected {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("timed out waiting for {expected} handled items, saw {current}");
        }
        sleep(Duration::from_millis(5)).await;
    }
}

/// Lets spawned tasks run without moving a paused clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
