//! Scheduler module for running probes and feeding metrics.

mod prober;

pub use prober::*;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use crate::config::{ConfigError, MonitorConfig};
use crate::metrics::{MetricsSnapshot, UrlMetrics};
use crate::probe::{ProbeClient, ProbeConfig, ProbeError};

/// Errors raised while starting the monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Runs one prober and one metrics consumer per monitored URL.
pub struct Monitor {
    metrics: Vec<UrlMetrics>,
    stop_tx: broadcast::Sender<()>,
    tasks: JoinSet<()>,
}

impl Monitor {
    /// Validate `config` and start monitoring every target.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;

        let (stop_tx, _) = broadcast::channel(1);
        let mut tasks = JoinSet::new();
        let mut all_metrics = Vec::with_capacity(config.targets.len());

        tracing::info!("Starting monitor with {} targets", config.targets.len());

        for target in &config.targets {
            let metrics = UrlMetrics::new(target, config).map_err(|source| ConfigError::Capacity {
                url: target.url.clone(),
                source,
            })?;
            let probe = ProbeConfig::new(target, config)?;
            // Each probe builds its own client; fail now on bad TLS settings
            ProbeClient::new(&probe)?;

            tracing::info!(
                "Monitor: Adding {} every {:?} (queue capacity {})",
                target.url,
                target.polling_interval,
                metrics.queue_capacity()
            );

            let (tx, rx) = mpsc::channel(metrics.queue_capacity());
            tasks.spawn(run_probe_loop(probe, tx, stop_tx.subscribe()));
            tasks.spawn(metrics.clone().run(rx));

            all_metrics.push(metrics);
        }

        Ok(Self {
            metrics: all_metrics,
            stop_tx,
            tasks,
        })
    }

    /// Metrics handles, one per target in configuration order.
    pub fn metrics(&self) -> &[UrlMetrics] {
        &self.metrics
    }

    /// A receiver that fires when the monitor shuts down.
    pub fn stop_signal(&self) -> broadcast::Receiver<()> {
        self.stop_tx.subscribe()
    }

    pub async fn snapshots(&self) -> Vec<MetricsSnapshot> {
        let mut snapshots = Vec::with_capacity(self.metrics.len());
        for metrics in &self.metrics {
            snapshots.push(metrics.snapshot().await);
        }
        snapshots
    }

    /// Stop every prober and wait for all probers and consumers to finish.
    pub async fn shutdown(mut self) {
        let _ = self.stop_tx.send(());

        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!("Monitor: Task failed during shutdown: {}", e);
            }
        }

        tracing::info!("Monitor stopped");
    }
}
