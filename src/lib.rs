//! webwatch - website availability monitor.
//!
//! Probes a set of URLs over HTTP, aggregates the samples of each URL into a
//! short and a long rolling window plus an availability alert, and renders
//! snapshots of those statistics.

pub mod cli;
pub mod config;
pub mod metrics;
pub mod probe;
pub mod scheduler;
pub mod ui;
