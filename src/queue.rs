//! Thread-safe containers shared between producers and the drain task.

pub mod concurrent;
