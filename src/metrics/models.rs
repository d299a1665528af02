//! Read-only snapshot types handed to presenters.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Average and maximum of a duration metric, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AvgMax {
    pub avg: i64,
    pub max: i64,
}

/// Which window of a URL to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Short,
    Long,
}

/// Statistics of one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    #[serde(serialize_with = "as_secs")]
    pub history_interval: Duration,
    pub capacity: usize,
    /// Samples currently held (at most `capacity`)
    pub samples: usize,
    pub availability: f64,
    pub status_histogram: BTreeMap<u16, usize>,
    pub dns: AvgMax,
    pub connect: AvgMax,
    pub first_byte: AvgMax,
    pub total: AvgMax,
}

/// Alert flags of one URL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertSnapshot {
    pub is_down: bool,
    pub just_recovered: bool,
    pub availability: f64,
}

/// Everything known about one URL, taken under a single read lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub url: String,
    #[serde(serialize_with = "as_secs")]
    pub polling_interval: Duration,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub samples_seen: u64,
    pub short: WindowSnapshot,
    pub long: WindowSnapshot,
    pub alert: AlertSnapshot,
}

impl MetricsSnapshot {
    pub fn window(&self, horizon: Horizon) -> &WindowSnapshot {
        match horizon {
            Horizon::Short => &self.short,
            Horizon::Long => &self.long,
        }
    }
}

fn as_secs<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_secs_f64())
}
