//! Configuration module for webwatch.
//!
//! Loads defaults from environment variables; the command line overrides them.

use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::{capacity_for, CapacityError};

/// Configuration error types.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("no urls to monitor")]
    NoTargets,
    #[error("urls must be given with their polling interval: {0}")]
    UnpairedTarget(String),
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid duration {0:?}: expected a positive number of seconds")]
    InvalidDuration(String),
    #[error("critical availability must be in (0, 1], got {0}")]
    InvalidCriticalAvailability(f64),
    #[error("{url}: {source}")]
    Capacity {
        url: String,
        #[source]
        source: CapacityError,
    },
}

/// A URL to monitor and how often to probe it.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub url: String,
    pub polling_interval: Duration,
}

/// Monitor configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub targets: Vec<Target>,
    /// History covered by the short window (default: 10s)
    pub short_history: Duration,
    /// History covered by the long window (default: 60s)
    pub long_history: Duration,
    /// History covered by the alert tracker (default: 120s)
    pub alert_interval: Duration,
    /// Availability below which a URL is down (default: 0.8)
    pub critical_availability: f64,
    /// How often the short window is rendered (default: 2s)
    pub short_refresh: Duration,
    /// How often the long window is rendered (default: 10s)
    pub long_refresh: Duration,
    /// Whole-request timeout (default: 5s)
    pub request_timeout: Duration,
    /// Connect timeout (default: 3s)
    pub connect_timeout: Duration,
    /// Skip TLS certificate verification (default: false)
    pub accept_invalid_certs: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            short_history: Duration::from_secs(10),
            long_history: Duration::from_secs(60),
            alert_interval: Duration::from_secs(120),
            critical_availability: 0.8,
            short_refresh: Duration::from_secs(2),
            long_refresh: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            accept_invalid_certs: false,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables (durations in seconds):
    /// - `WEBWATCH_SHORT_HISTORY`, `WEBWATCH_LONG_HISTORY`, `WEBWATCH_ALERT_INTERVAL`
    /// - `WEBWATCH_CRITICAL_AVAILABILITY`
    /// - `WEBWATCH_SHORT_REFRESH`, `WEBWATCH_LONG_REFRESH`
    /// - `WEBWATCH_TIMEOUT`, `WEBWATCH_CONNECT_TIMEOUT`
    /// - `WEBWATCH_INSECURE` (`1` or `true`)
    ///
    /// Unparseable values are ignored.
    pub fn load() -> Self {
        Self::load_from(|key| env::var(key).ok())
    }

    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let duration = |key: &str, slot: &mut Duration| {
            if let Some(d) = lookup(key).and_then(|v| parse_secs(&v).ok()) {
                *slot = d;
            }
        };
        duration("WEBWATCH_SHORT_HISTORY", &mut cfg.short_history);
        duration("WEBWATCH_LONG_HISTORY", &mut cfg.long_history);
        duration("WEBWATCH_ALERT_INTERVAL", &mut cfg.alert_interval);
        duration("WEBWATCH_SHORT_REFRESH", &mut cfg.short_refresh);
        duration("WEBWATCH_LONG_REFRESH", &mut cfg.long_refresh);
        duration("WEBWATCH_TIMEOUT", &mut cfg.request_timeout);
        duration("WEBWATCH_CONNECT_TIMEOUT", &mut cfg.connect_timeout);

        if let Some(v) = lookup("WEBWATCH_CRITICAL_AVAILABILITY") {
            if let Ok(critical) = v.trim().parse() {
                cfg.critical_availability = critical;
            }
        }

        if let Some(v) = lookup("WEBWATCH_INSECURE") {
            cfg.accept_invalid_certs = matches!(v.trim(), "1" | "true" | "yes");
        }

        cfg
    }

    /// Check every precondition of the pipeline before anything starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let critical = self.critical_availability;
        if !(critical > 0.0 && critical <= 1.0) {
            return Err(ConfigError::InvalidCriticalAvailability(critical));
        }

        for d in [self.short_refresh, self.long_refresh, self.request_timeout, self.connect_timeout] {
            if d.is_zero() {
                return Err(ConfigError::InvalidDuration(format!("{:?}", d)));
            }
        }

        for target in &self.targets {
            for history in [self.short_history, self.long_history, self.alert_interval] {
                capacity_for(history, target.polling_interval).map_err(|source| {
                    ConfigError::Capacity {
                        url: target.url.clone(),
                        source,
                    }
                })?;
            }
        }

        Ok(())
    }
}

/// Parse a positive number of seconds.
pub fn parse_secs(raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(raw.to_string()))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidDuration(raw.to_string()));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Parse `URL SECONDS` pairs into targets.
pub fn parse_targets(args: &[String]) -> Result<Vec<Target>, ConfigError> {
    if args.is_empty() {
        return Err(ConfigError::NoTargets);
    }

    let pairs = args.chunks_exact(2);
    if let Some(extra) = pairs.remainder().first() {
        return Err(ConfigError::UnpairedTarget(extra.clone()));
    }

    pairs
        .map(|pair| {
            Ok(Target {
                url: normalize_url(&pair[0])?,
                polling_interval: parse_secs(&pair[1])?,
            })
        })
        .collect()
}

/// Turn user input such as `example.com` into a full http(s) URL.
///
/// Input without a scheme gets `http` when its port is 80 and `https`
/// otherwise.
pub fn normalize_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        let rest = raw.trim_start_matches("//");
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let scheme = if authority.ends_with(":80") { "http" } else { "https" };
        format!("{}://{}", scheme, rest)
    };

    let url = reqwest::Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {:?}", other))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url.to_string())
}
