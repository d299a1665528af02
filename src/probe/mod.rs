//! Probe module for website monitoring.
//!
//! Issues one timed HTTP GET per tick and turns the outcome into a `Sample`.

mod http;

pub use http::*;

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::config::{MonitorConfig, Target};

/// Timing marker for a phase that could not be measured.
pub const UNMEASURED: i64 = -1;

/// Status code recorded when no HTTP response was received.
pub const TRANSPORT_ERROR: u16 = 0;

pub(crate) const USER_AGENT: &str = concat!("webwatch/", env!("CARGO_PKG_VERSION"));

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// The outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// When the probe started.
    pub time: DateTime<Utc>,
    pub url: String,
    pub polling_interval: Duration,
    /// HTTP status code, or `TRANSPORT_ERROR`
    pub status_code: u16,
    /// Milliseconds spent resolving the host name, or `UNMEASURED`
    pub dns_ms: i64,
    /// Milliseconds until the connection was ready (name lookup and TLS
    /// included), or `UNMEASURED`
    pub connect_ms: i64,
    /// Milliseconds until the response headers arrived, or `UNMEASURED`
    pub first_byte_ms: i64,
    /// Milliseconds until the body was fully read, or `UNMEASURED`
    pub total_ms: i64,
}

impl Sample {
    /// A sample for a probe that never got an HTTP response.
    pub fn failed(url: &str, polling_interval: Duration, time: DateTime<Utc>) -> Self {
        Self {
            time,
            url: url.to_string(),
            polling_interval,
            status_code: TRANSPORT_ERROR,
            dns_ms: UNMEASURED,
            connect_ms: UNMEASURED,
            first_byte_ms: UNMEASURED,
            total_ms: UNMEASURED,
        }
    }

    /// Only a plain 200 counts towards availability.
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Probe configuration for one monitored URL.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub url: reqwest::Url,
    pub polling_interval: Duration,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl ProbeConfig {
    pub fn new(target: &Target, config: &MonitorConfig) -> Result<Self, ProbeError> {
        let url = reqwest::Url::parse(&target.url)
            .map_err(|e| ProbeError::Config(format!("invalid url {:?}: {}", target.url, e)))?;

        Ok(Self {
            url,
            polling_interval: target.polling_interval,
            timeout: config.request_timeout,
            connect_timeout: config.connect_timeout,
            accept_invalid_certs: config.accept_invalid_certs,
        })
    }
}

/// Run one probe and record its outcome.
///
/// Never fails: transport errors become a sample with `TRANSPORT_ERROR` and
/// unmeasured timings.
pub async fn run_probe(config: &ProbeConfig) -> Sample {
    // Add jitter so URLs sharing an interval do not fire in lock-step
    let jitter = rand::random::<u64>() % 100;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    let time = Utc::now();
    match run_http_probe(config).await {
        Ok(timings) => Sample {
            time,
            url: config.url.to_string(),
            polling_interval: config.polling_interval,
            status_code: timings.status_code,
            dns_ms: timings.dns_ms,
            connect_ms: timings.connect_ms,
            first_byte_ms: timings.first_byte_ms,
            total_ms: timings.total_ms,
        },
        Err(e) => {
            tracing::warn!("Probe failed for {}: {}", config.url, e);
            Sample::failed(config.url.as_str(), config.polling_interval, time)
        }
    }
}
