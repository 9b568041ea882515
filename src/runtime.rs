//! Runtime glue: configuration, the handler capability, and tracing/telemetry.

pub mod config;
pub mod handler;
pub mod telemetry;
