//! One-shot, reschedulable timer backing the drain cadence.
//!
//! A [`BatchTimer`] owns a single driver task that sleeps until the current deadline and then
//! runs its action once. The deadline itself lives in a `watch` channel so that arming,
//! resetting, and cancelling are plain synchronous calls on a cloneable [`TimerHandle`], usable
//! from any thread, including from inside the action while it runs.

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::select;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

// Upper bound on how far out a deadline may be scheduled. Longer delays are clamped to it.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Cloneable control surface for a [`BatchTimer`].
#[derive(Clone, Debug)]
pub struct TimerHandle {
    deadline: Arc<watch::Sender<Option<Instant>>>,
}

impl TimerHandle {
    pub fn new() -> Self {
        let (deadline, _) = watch::channel(None);
        Self {
            deadline: Arc::new(deadline),
        }
    }

    /// Schedules the action to fire once, `delay` from now.
    ///
    /// Delays beyond roughly thirty years are clamped, so an oversized interval never overflows
    /// the clock.
    pub fn arm(&self, delay: Duration) {
        self.deadline.send_replace(Some(deadline_after(delay)));
    }

    /// Replaces any pending deadline with one `delay` from now.
    pub fn reset(&self, delay: Duration) {
        self.arm(delay);
    }

    /// Drops the pending deadline, if any. An action that is already running is not interrupted.
    pub fn cancel(&self) {
        self.deadline.send_replace(None);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.borrow().is_some()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Instant>> {
        self.deadline.subscribe()
    }

    // Clears the deadline only if it is still the one that just fired.
    fn clear_fired(&self, fired: Instant) {
        self.deadline.send_if_modified(|current| {
            if *current == Some(fired) {
                *current = None;
                true
            } else {
                false
            }
        });
    }
}

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay.min(FAR_FUTURE))
        .unwrap_or_else(|| now + Duration::from_secs(86_400))
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BatchTimer {
    handle: TimerHandle,
    shutdown: CancellationToken,
    driver: JoinHandle<()>,
}

impl BatchTimer {
    /// Starts the driver task for `handle`. Must be called from within a tokio runtime.
    pub fn spawn<F>(handle: TimerHandle, action: F, shutdown: CancellationToken) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let driver = tokio::spawn(drive(handle.clone(), action, shutdown.clone()));
        Self {
            handle,
            shutdown,
            driver,
        }
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Stops the driver and waits for it, including any action currently running.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.handle.cancel();
        if let Err(err) = self.driver.await {
            tracing::warn!(error = %err, "batch timer driver panicked");
        }
    }
}

async fn drive<F>(handle: TimerHandle, action: F, shutdown: CancellationToken)
where
    F: Fn() -> BoxFuture<'static, ()>,
{
    let mut deadline = handle.subscribe();

    loop {
        let next = *deadline.borrow_and_update();
        match next {
            None => {
                select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    changed = deadline.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            Some(at) => {
                select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    changed = deadline.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = sleep_until(at) => {
                        handle.clear_fired(at);
                        action().await;
                    }
                }
            }
        }
    }

    tracing::trace!("batch timer driver stopped");
}
