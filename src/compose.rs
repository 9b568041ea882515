//! Small composition helpers that live alongside the worker: ordered middleware chains and a
//! two-sided collection diff.

pub mod chain;
pub mod diff;
