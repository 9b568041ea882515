use core::future::Future;
use core::pin::Pin;

pub type EventFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Per-item callback injected into an [`IntervalWorker`](crate::IntervalWorker).
///
/// Implement this directly when handling an item needs to await I/O. Plain closures
/// `Fn(T)` get a blanket implementation that runs synchronously.
///
/// A panic inside `on_event` is not caught: it ends the task that invoked the handler and is
/// reported when the worker closes.
pub trait EventHandler<T>: Send + Sync + 'static {
    fn on_event(&self, item: T) -> EventFuture<'_>;
}

impl<T, F> EventHandler<T> for F
where
    F: Fn(T) + Send + Sync + 'static,
{
    fn on_event(&self, item: T) -> EventFuture<'_> {
        self(item);
        Box::pin(core::future::ready(()))
    }
}
