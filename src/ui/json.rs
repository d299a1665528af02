//! JSON-lines presenter.

use serde::Serialize;
use std::io::{self, Write};

use super::Presenter;
use crate::metrics::{Horizon, MetricsSnapshot};

#[derive(Serialize)]
struct JsonLine<'a> {
    horizon: Horizon,
    #[serde(flatten)]
    snapshot: &'a MetricsSnapshot,
}

/// Writes one JSON object per URL per refresh.
pub struct JsonPresenter<W: Write> {
    out: W,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn render(&mut self, snapshots: &[MetricsSnapshot], horizon: Horizon) -> io::Result<()> {
        for snapshot in snapshots {
            serde_json::to_writer(&mut self.out, &JsonLine { horizon, snapshot })?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{AlertSnapshot, AvgMax, WindowSnapshot};
    use std::time::Duration;

    fn window(history_secs: u64) -> WindowSnapshot {
        WindowSnapshot {
            history_interval: Duration::from_secs(history_secs),
            capacity: 4,
            samples: 2,
            availability: 0.25,
            status_histogram: [(200, 1), (0, 1)].into_iter().collect(),
            dns: AvgMax { avg: 1, max: 3 },
            connect: AvgMax { avg: 5, max: 20 },
            first_byte: AvgMax { avg: 10, max: 40 },
            total: AvgMax { avg: 11, max: 44 },
        }
    }

    #[test]
    fn test_json_lines() {
        let snap = MetricsSnapshot {
            url: "http://example.com/".to_string(),
            polling_interval: Duration::from_millis(2500),
            last_timestamp: None,
            samples_seen: 2,
            short: window(10),
            long: window(60),
            alert: AlertSnapshot {
                is_down: false,
                just_recovered: true,
                availability: 0.8,
            },
        };

        let mut presenter = JsonPresenter::new(Vec::new());
        presenter.render(&[snap.clone(), snap], Horizon::Long).unwrap();

        let out = String::from_utf8(presenter.out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["horizon"], "long");
        assert_eq!(value["url"], "http://example.com/");
        assert_eq!(value["polling_interval"], 2.5);
        assert_eq!(value["long"]["history_interval"], 60.0);
        assert_eq!(value["short"]["status_histogram"]["200"], 1);
        assert_eq!(value["short"]["first_byte"]["max"], 40);
        assert_eq!(value["short"]["dns"]["avg"], 1);
        assert_eq!(value["alert"]["just_recovered"], true);
        assert!(value["last_timestamp"].is_null());
    }
}
