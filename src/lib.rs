pub mod compose;
pub mod processor;
pub mod queue;
pub mod runtime;

pub use compose::chain::{Middleware, MiddlewareChain};
pub use compose::diff::{diff, Diff};
pub use processor::interval::IntervalWorker;
pub use processor::timer::{BatchTimer, TimerHandle};
pub use processor::worker_pool::{HandoffSender, WorkerPool};
pub use queue::concurrent::ConcurrentQueue;
pub use runtime::config::{
    DispatchMode, WorkerConfig, WorkerConfigBuilder, DEFAULT_INTERVAL, DEFAULT_TAKE_COUNT,
    DEFAULT_WORKER_COUNT,
};
pub use runtime::handler::{EventFuture, EventHandler};
pub use runtime::telemetry::{
    init_tracing, Telemetry, TelemetrySnapshot, DEFAULT_LOG_DIRECTIVE,
};
