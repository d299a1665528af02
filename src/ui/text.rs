//! Plain-text table presenter.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Write};

use super::Presenter;
use crate::metrics::{AvgMax, Horizon, MetricsSnapshot};

/// Writes a stats table per refresh, followed by any new alerts.
///
/// Alert state is keyed by position in the snapshot list, which is the
/// target order, so a URL configured twice is tracked twice.
pub struct TextPresenter<W: Write> {
    out: W,
    reported_down: HashSet<usize>,
    /// `samples_seen` at the last announced recovery, per target
    recovered_at: HashMap<usize, u64>,
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            reported_down: HashSet::new(),
            recovered_at: HashMap::new(),
        }
    }

    /// Alerts not yet reported for `snapshots`.
    ///
    /// Presenters poll, so the update that set `just_recovered` may be missed
    /// or seen twice: a URL reported down that is no longer down also counts
    /// as recovered, and a recovery is announced once per sample.
    fn new_alerts(&mut self, snapshots: &[MetricsSnapshot]) -> Vec<String> {
        let mut alerts = Vec::new();

        for (target, snap) in snapshots.iter().enumerate() {
            let when = format_time(snap.last_timestamp.unwrap_or_else(Utc::now));
            let availability = snap.alert.availability;

            if snap.alert.is_down {
                if self.reported_down.insert(target) {
                    alerts.push(format!(
                        "Website {} is down. availability={:.2}, time={}",
                        snap.url, availability, when
                    ));
                }
            } else {
                let was_reported = self.reported_down.remove(&target);
                let fresh = snap.alert.just_recovered
                    && self.recovered_at.get(&target) != Some(&snap.samples_seen);

                if was_reported || fresh {
                    self.recovered_at.insert(target, snap.samples_seen);
                    alerts.push(format!(
                        "Website {} has recovered. availability={:.2}, time={}",
                        snap.url, availability, when
                    ));
                }
            }
        }

        alerts
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn render(&mut self, snapshots: &[MetricsSnapshot], horizon: Horizon) -> io::Result<()> {
        let last_update = snapshots.iter().filter_map(|s| s.last_timestamp).max();
        let history = snapshots
            .first()
            .map(|s| format!("{}s", s.window(horizon).history_interval.as_secs_f64()))
            .unwrap_or_default();

        writeln!(
            self.out,
            "monitoring {} websites | {} stats over {} | last update: {}",
            snapshots.len(),
            match horizon {
                Horizon::Short => "short",
                Horizon::Long => "long",
            },
            history,
            last_update.map(format_time).unwrap_or_else(|| "-".to_string()),
        )?;
        writeln!(
            self.out,
            "{:<40} {:<28} {:>12} {:>18} {:>18} {:>18}",
            "WEBSITE", "STATUS CODES", "AVAILABILITY", "CONNECT", "FIRST BYTE", "TOTAL"
        )?;

        for snap in snapshots {
            let window = snap.window(horizon);
            writeln!(
                self.out,
                "{:<40} {:<28} {:>11.2}% {:>18} {:>18} {:>18}",
                snap.url,
                format_histogram(&window.status_histogram),
                window.availability * 100.0,
                format_avg_max(window.connect),
                format_avg_max(window.first_byte),
                format_avg_max(window.total),
            )?;
        }

        for alert in self.new_alerts(snapshots) {
            writeln!(self.out, "{}", alert)?;
        }
        writeln!(self.out)?;

        self.out.flush()
    }
}

fn format_histogram(histogram: &BTreeMap<u16, usize>) -> String {
    if histogram.is_empty() {
        return "-".to_string();
    }
    histogram
        .iter()
        .map(|(code, count)| format!("({}: {})", code, count))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_avg_max(stat: AvgMax) -> String {
    format!("{}ms ({}ms)", stat.avg, stat.max)
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
