use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TAKE_COUNT: usize = 5;
pub const DEFAULT_WORKER_COUNT: usize = 1;

pub const ENV_INTERVAL_MS: &str = "INTERVAL_WORKER_INTERVAL_MS";
pub const ENV_TAKE_COUNT: &str = "INTERVAL_WORKER_TAKE_COUNT";
pub const ENV_WORKER_COUNT: &str = "INTERVAL_WORKER_COUNT";
pub const ENV_DISPATCH: &str = "INTERVAL_WORKER_DISPATCH";
pub const ENV_METRICS_MS: &str = "INTERVAL_WORKER_METRICS_MS";

/// How a drain hands the items it took to the per-item handler.
///
/// `Pool` routes every drained item through the handoff channel so pool consumers run the
/// handler in parallel. `Inline` awaits each handler call inside the drain itself, in take
/// order, and leaves the pool idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    #[default]
    Pool,
    Inline,
}

impl FromStr for DispatchMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pool" => Ok(Self::Pool),
            "inline" => Ok(Self::Inline),
            other => bail!("unknown dispatch mode `{other}` (expected `pool` or `inline`)"),
        }
    }
}

/// Runtime configuration for an [`IntervalWorker`](crate::IntervalWorker).
///
/// Built through [`WorkerConfig::builder`], [`WorkerConfig::from_env`], or
/// [`WorkerConfig::default`]. Zero values passed to the builder fall back to the defaults rather
/// than failing, so a partially filled builder is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    interval: Duration,
    take_count: usize,
    worker_count: usize,
    dispatch_mode: DispatchMode,
    metrics_interval: Option<Duration>,
}

impl WorkerConfig {
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }

    /// Reads overrides from the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`WorkerConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_INTERVAL_MS)? {
            builder = builder.interval(Duration::from_millis(ms));
        }
        if let Some(count) = parse_var::<usize, _>(&lookup, ENV_TAKE_COUNT)? {
            builder = builder.take_count(count);
        }
        if let Some(count) = parse_var::<usize, _>(&lookup, ENV_WORKER_COUNT)? {
            builder = builder.worker_count(count);
        }
        if let Some(mode) = parse_var::<DispatchMode, _>(&lookup, ENV_DISPATCH)? {
            builder = builder.dispatch_mode(mode);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_METRICS_MS)? {
            builder = builder.metrics_interval(Duration::from_millis(ms));
        }

        builder.build()
    }

    /// Delay between a push into an idle worker and the first drain, and between drains.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum number of items removed per drain.
    pub fn take_count(&self) -> usize {
        self.take_count
    }

    /// Number of pool consumer tasks, also the handoff channel capacity.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch_mode
    }

    /// Period of the metrics reporter, `None` when the reporter is disabled.
    pub fn metrics_interval(&self) -> Option<Duration> {
        self.metrics_interval
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            bail!("interval must be greater than 0");
        }

        if self.take_count == 0 {
            bail!("take_count must be greater than 0");
        }

        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }

        if matches!(self.metrics_interval, Some(interval) if interval.is_zero()) {
            bail!("metrics_interval must be greater than 0 when set");
        }

        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            take_count: DEFAULT_TAKE_COUNT,
            worker_count: DEFAULT_WORKER_COUNT,
            dispatch_mode: DispatchMode::default(),
            metrics_interval: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct WorkerConfigBuilder {
    interval: Option<Duration>,
    take_count: Option<usize>,
    worker_count: Option<usize>,
    dispatch_mode: Option<DispatchMode>,
    metrics_interval: Option<Duration>,
}

impl WorkerConfigBuilder {
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn take_count(mut self, count: usize) -> Self {
        self.take_count = Some(count);
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = Some(mode);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<WorkerConfig> {
        let config = WorkerConfig {
            interval: self
                .interval
                .filter(|interval| !interval.is_zero())
                .unwrap_or(DEFAULT_INTERVAL),
            take_count: non_zero_or(self.take_count, DEFAULT_TAKE_COUNT),
            worker_count: non_zero_or(self.worker_count, DEFAULT_WORKER_COUNT),
            dispatch_mode: self.dispatch_mode.unwrap_or_default(),
            metrics_interval: self.metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }
}

fn non_zero_or(value: Option<usize>, default: usize) -> usize {
    value.filter(|value| *value > 0).unwrap_or(default)
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse::<T>()
        .map(Some)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("invalid value `{raw}` for {key}"))
}
