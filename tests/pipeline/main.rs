#[path = "../support/mod.rs"]
mod support;

mod producers;
mod shutdown;
