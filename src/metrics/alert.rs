//! Availability alerting.

use std::num::NonZeroUsize;
use std::time::Duration;

use super::{capacity_for, round2, AlertSnapshot, CapacityError, RingBuffer};
use crate::probe::Sample;

/// Alert state of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Healthy,
    Down,
}

/// Tracks availability over the alert interval and raises down/recovered
/// signals.
///
/// A new tracker starts `Healthy`, as if every slot of its window held a
/// success, so a URL is only reported down once enough real failures have
/// been observed. `just_recovered` is set for exactly the one update on which
/// availability climbs back to the critical threshold.
#[derive(Debug, Clone)]
pub struct AlertTracker {
    window: RingBuffer<bool>,
    successes: usize,
    availability: f64,
    critical_availability: f64,
    is_down: bool,
    just_recovered: bool,
}

impl AlertTracker {
    pub fn new(
        alert_interval: Duration,
        polling_interval: Duration,
        critical_availability: f64,
    ) -> Result<Self, CapacityError> {
        let capacity = capacity_for(alert_interval, polling_interval)?;
        Ok(Self::with_capacity(capacity, critical_availability))
    }

    pub fn with_capacity(capacity: NonZeroUsize, critical_availability: f64) -> Self {
        let mut window = RingBuffer::new(capacity);
        for _ in 0..capacity.get() {
            window.push(true);
        }

        Self {
            window,
            successes: capacity.get(),
            availability: 1.0,
            critical_availability,
            is_down: false,
            just_recovered: false,
        }
    }

    pub fn update(&mut self, sample: &Sample) {
        self.record(sample.is_success());
    }

    fn record(&mut self, success: bool) {
        if let Some(true) = self.window.push(success) {
            self.successes -= 1;
        }
        if success {
            self.successes += 1;
        }
        self.availability = round2(self.successes as f64 / self.window.capacity() as f64);

        let was_down = self.is_down;
        self.is_down = self.availability < self.critical_availability;
        self.just_recovered = was_down && !self.is_down;
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn availability(&self) -> f64 {
        self.availability
    }

    pub fn is_down(&self) -> bool {
        self.is_down
    }

    pub fn just_recovered(&self) -> bool {
        self.just_recovered
    }

    pub fn state(&self) -> AlertState {
        if self.is_down {
            AlertState::Down
        } else {
            AlertState::Healthy
        }
    }

    pub fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            is_down: self.is_down,
            just_recovered: self.just_recovered,
            availability: self.availability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::UNMEASURED;
    use chrono::Utc;

    const POLL: Duration = Duration::from_secs(1);

    fn tracker() -> AlertTracker {
        AlertTracker::new(Duration::from_secs(10), POLL, 0.8).unwrap()
    }

    fn ok() -> Sample {
        Sample {
            time: Utc::now(),
            url: "testurl".to_string(),
            polling_interval: POLL,
            status_code: 200,
            dns_ms: 1,
            connect_ms: 10,
            first_byte_ms: 5,
            total_ms: 6,
        }
    }

    fn err() -> Sample {
        Sample {
            status_code: 0,
            dns_ms: UNMEASURED,
            connect_ms: UNMEASURED,
            first_byte_ms: UNMEASURED,
            total_ms: UNMEASURED,
            ..ok()
        }
    }

    #[test]
    fn test_starts_healthy() {
        let t = tracker();
        assert_eq!(t.capacity(), 10);
        assert_eq!(t.availability(), 1.0);
        assert!(!t.is_down());
        assert!(!t.just_recovered());
        assert_eq!(t.state(), AlertState::Healthy);
    }

    #[test]
    fn test_full_window_of_successes() {
        let mut t = tracker();
        for _ in 0..t.capacity() {
            t.update(&ok());
        }
        assert_eq!(t.availability(), 1.0);
        assert!(!t.is_down());
    }

    #[test]
    fn test_full_window_of_failures() {
        let mut t = tracker();
        for _ in 0..t.capacity() {
            t.update(&err());
        }
        assert_eq!(t.availability(), 0.0);
        assert!(t.is_down());
        assert_eq!(t.state(), AlertState::Down);
    }

    #[test]
    fn test_non_200_counts_as_failure() {
        let mut t = tracker();
        let redirect = Sample { status_code: 301, ..ok() };
        for _ in 0..3 {
            t.update(&redirect);
        }
        assert_eq!(t.availability(), 0.7);
        assert!(t.is_down());
    }

    #[test]
    fn test_down_then_recovered() {
        let mut t = tracker();

        for _ in 0..2 {
            // Down
            for _ in 0..10 {
                t.update(&err());
                assert!(!t.just_recovered());
            }
            assert!(t.is_down());
            assert_eq!(t.availability(), 0.0);

            // Recovering
            for _ in 0..7 {
                t.update(&ok());
                assert!(t.is_down());
                assert!(!t.just_recovered());
            }
            assert_eq!(t.availability(), 0.7);

            // Recovered
            t.update(&ok());
            assert_eq!(t.availability(), 0.8);
            assert!(!t.is_down());
            assert!(t.just_recovered());

            // Healthy
            for _ in 0..10 {
                t.update(&ok());
                assert!(!t.is_down());
                assert!(!t.just_recovered());
            }
            assert_eq!(t.availability(), 1.0);
        }
    }

    #[test]
    fn test_just_recovered_once_per_crossing() {
        let mut t = tracker();
        let pattern: Vec<bool> = [(false, 4), (true, 10), (false, 2), (true, 3)]
            .iter()
            .flat_map(|&(success, n)| std::iter::repeat(success).take(n))
            .collect();
        let mut recoveries = 0;
        let mut crossings = 0;
        let mut was_down = t.is_down();

        for _ in 0..5 {
            for &success in &pattern {
                t.update(&if success { ok() } else { err() });
                if was_down && !t.is_down() {
                    crossings += 1;
                }
                if t.just_recovered() {
                    recoveries += 1;
                }
                was_down = t.is_down();
            }
        }
        assert!(crossings > 0);
        assert_eq!(recoveries, crossings);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let pattern: Vec<bool> = (0..40).map(|i| i % 3 != 0 || i > 30).collect();
        let mut a = tracker();
        let mut b = tracker();
        for &success in &pattern {
            a.update(&if success { ok() } else { err() });
        }
        for &success in &pattern {
            b.update(&if success { ok() } else { err() });
        }
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.successes, b.successes);
    }
}
