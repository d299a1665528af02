//! Command-line arguments.

use clap::{Parser, ValueEnum};

use crate::config::{parse_secs, parse_targets, ConfigError, MonitorConfig};

/// How snapshots are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Monitor website availability and response times.
///
/// Durations are given in seconds and override `WEBWATCH_*` environment
/// variables.
#[derive(Parser, Debug)]
#[command(name = "webwatch", version)]
pub struct Args {
    /// URL and polling interval pairs: URL1 SECONDS1 [URL2 SECONDS2 ...]
    #[arg(value_name = "URL SECONDS", required = true, num_args = 2..)]
    pub targets: Vec<String>,

    /// Short refresh interval
    #[arg(long = "sui")]
    pub short_refresh: Option<String>,

    /// Long refresh interval
    #[arg(long = "lui")]
    pub long_refresh: Option<String>,

    /// History covered by the short stats
    #[arg(long = "sstats")]
    pub short_history: Option<String>,

    /// History covered by the long stats
    #[arg(long = "lstats")]
    pub long_history: Option<String>,

    /// History covered by the availability alert
    #[arg(long = "alert")]
    pub alert_interval: Option<String>,

    /// Availability below which a website is reported down
    #[arg(long)]
    pub critical: Option<f64>,

    /// Request timeout
    #[arg(long)]
    pub timeout: Option<String>,

    /// Connect timeout
    #[arg(long)]
    pub connect_timeout: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Args {
    /// Apply these arguments on top of `base`.
    pub fn apply(&self, mut base: MonitorConfig) -> Result<MonitorConfig, ConfigError> {
        base.targets = parse_targets(&self.targets)?;

        let overrides = [
            (&self.short_refresh, &mut base.short_refresh),
            (&self.long_refresh, &mut base.long_refresh),
            (&self.short_history, &mut base.short_history),
            (&self.long_history, &mut base.long_history),
            (&self.alert_interval, &mut base.alert_interval),
            (&self.timeout, &mut base.request_timeout),
            (&self.connect_timeout, &mut base.connect_timeout),
        ];
        for (raw, slot) in overrides {
            if let Some(raw) = raw {
                *slot = parse_secs(raw)?;
            }
        }

        if let Some(critical) = self.critical {
            base.critical_availability = critical;
        }
        if self.insecure {
            base.accept_invalid_certs = true;
        }

        Ok(base)
    }
}
