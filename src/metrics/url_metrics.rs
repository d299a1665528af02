//! Per-URL metrics owned by a single consumer loop.

use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use super::{capacity_for, AlertTracker, CapacityError, MetricsSnapshot, Window};
use crate::config::{MonitorConfig, Target};
use crate::probe::Sample;

#[derive(Debug)]
struct MetricsState {
    url: String,
    polling_interval: Duration,
    last_timestamp: Option<DateTime<Utc>>,
    samples_seen: u64,
    short: Window,
    long: Window,
    alert: AlertTracker,
}

/// Shared handle to the metrics of one monitored URL.
///
/// Only the consumer loop (`run`) writes; readers take `snapshot`.
#[derive(Debug, Clone)]
pub struct UrlMetrics {
    state: Arc<RwLock<MetricsState>>,
    queue_capacity: NonZeroUsize,
}

impl UrlMetrics {
    /// Create the metrics for `target`.
    ///
    /// `target.url` may be left empty; it is then taken from the first
    /// sample received.
    pub fn new(target: &Target, config: &MonitorConfig) -> Result<Self, CapacityError> {
        let polling = target.polling_interval;
        let short = Window::new(config.short_history, polling)?;
        let long = Window::new(config.long_history, polling)?;
        let alert = AlertTracker::new(config.alert_interval, polling, config.critical_availability)?;
        let queue_capacity = capacity_for(config.long_history, polling)?;

        Ok(Self {
            state: Arc::new(RwLock::new(MetricsState {
                url: target.url.clone(),
                polling_interval: polling,
                last_timestamp: None,
                samples_seen: 0,
                short,
                long,
                alert,
            })),
            queue_capacity,
        })
    }

    /// Capacity of the sample queue feeding this URL (the long window's).
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.get()
    }

    /// Drain `rx` until every sender is gone, applying samples in order.
    pub async fn run(self, mut rx: mpsc::Receiver<Sample>) {
        while let Some(sample) = rx.recv().await {
            self.apply(&sample).await;
        }

        let state = self.state.read().await;
        tracing::info!(
            "Metrics: Consumer for {} stopped after {} samples",
            state.url,
            state.samples_seen
        );
    }

    /// Apply one sample to both windows and the alert tracker.
    pub async fn apply(&self, sample: &Sample) {
        let mut state = self.state.write().await;

        if state.url.is_empty() {
            state.url = sample.url.clone();
        }

        let was_down = state.alert.is_down();

        state.short.aggregate(sample);
        state.long.aggregate(sample);
        state.alert.update(sample);
        state.last_timestamp = Some(Utc::now());
        state.samples_seen += 1;

        tracing::debug!(
            "Metrics: {} status={} connect={}ms first_byte={}ms",
            state.url,
            sample.status_code,
            sample.connect_ms,
            sample.first_byte_ms
        );

        if !was_down && state.alert.is_down() {
            tracing::warn!(
                "Website {} is down. availability={:.2}",
                state.url,
                state.alert.availability()
            );
        }
        if state.alert.just_recovered() {
            tracing::info!(
                "Website {} has recovered. availability={:.2}",
                state.url,
                state.alert.availability()
            );
        }
    }

    /// A consistent view of all three aggregates.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.read().await;

        MetricsSnapshot {
            url: state.url.clone(),
            polling_interval: state.polling_interval,
            last_timestamp: state.last_timestamp,
            samples_seen: state.samples_seen,
            short: state.short.snapshot(),
            long: state.long.snapshot(),
            alert: state.alert.snapshot(),
        }
    }
}
