//! Drain orchestration: the batch timer, the consumer pool, and the interval worker tying them
//! together.

pub mod interval;
pub mod timer;
pub mod worker_pool;
