//! Presentation of metrics snapshots.
//!
//! Presenters only read: they pull snapshots on their own timers.

mod json;
mod text;

pub use json::*;
pub use text::*;

use std::io;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::metrics::{Horizon, MetricsSnapshot, UrlMetrics};

/// Renders a set of snapshots for one horizon.
pub trait Presenter {
    fn render(&mut self, snapshots: &[MetricsSnapshot], horizon: Horizon) -> io::Result<()>;
}

/// Render the short window every `short_refresh` and the long window every
/// `long_refresh` until `stop_rx` fires.
pub async fn run_presenter<P: Presenter>(
    metrics: Vec<UrlMetrics>,
    mut presenter: P,
    short_refresh: Duration,
    long_refresh: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) -> io::Result<()> {
    let start = tokio::time::Instant::now();
    let mut short = tokio::time::interval_at(start + short_refresh, short_refresh);
    let mut long = tokio::time::interval_at(start + long_refresh, long_refresh);

    loop {
        let horizon = tokio::select! {
            biased;
            _ = stop_rx.recv() => return Ok(()),
            _ = long.tick() => Horizon::Long,
            _ = short.tick() => Horizon::Short,
        };

        let snapshots = collect(&metrics).await;
        presenter.render(&snapshots, horizon)?;
    }
}

async fn collect(metrics: &[UrlMetrics]) -> Vec<MetricsSnapshot> {
    let mut snapshots = Vec::with_capacity(metrics.len());
    for m in metrics {
        snapshots.push(m.snapshot().await);
    }
    snapshots
}
