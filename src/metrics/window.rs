//! Rolling statistics over one history horizon.

use std::collections::BTreeMap;
use std::time::Duration;

use super::{capacity_for, round2, AvgMax, CapacityError, RingBuffer, WindowSnapshot};
use crate::probe::{Sample, UNMEASURED};

/// Aggregates the last `capacity` samples of one URL.
///
/// Availability and the duration averages are taken over the full capacity,
/// not over the samples received so far: a window that is still filling, or
/// that holds failed probes, reports lower figures. Failed probes are left out
/// of the duration sums and maxima but still count in the histogram.
#[derive(Debug, Clone)]
pub struct Window {
    history_interval: Duration,
    buffer: RingBuffer<Sample>,
    status_histogram: BTreeMap<u16, usize>,
    availability: f64,
    dns: AvgMax,
    connect: AvgMax,
    first_byte: AvgMax,
    total: AvgMax,
}

impl Window {
    pub fn new(history_interval: Duration, polling_interval: Duration) -> Result<Self, CapacityError> {
        let capacity = capacity_for(history_interval, polling_interval)?;

        Ok(Self {
            history_interval,
            buffer: RingBuffer::new(capacity),
            status_histogram: BTreeMap::new(),
            availability: 0.0,
            dns: AvgMax::default(),
            connect: AvgMax::default(),
            first_byte: AvgMax::default(),
            total: AvgMax::default(),
        })
    }

    /// Add `sample`, evicting the oldest one once the window is full.
    pub fn aggregate(&mut self, sample: &Sample) {
        if let Some(evicted) = self.buffer.push(sample.clone()) {
            self.forget_status(evicted.status_code);
        }
        *self.status_histogram.entry(sample.status_code).or_insert(0) += 1;

        let capacity = self.capacity();
        self.dns = AvgMax::over(self.buffer.iter().map(|s| s.dns_ms), capacity);
        self.connect = AvgMax::over(self.buffer.iter().map(|s| s.connect_ms), capacity);
        self.first_byte = AvgMax::over(self.buffer.iter().map(|s| s.first_byte_ms), capacity);
        self.total = AvgMax::over(self.buffer.iter().map(|s| s.total_ms), capacity);

        let successes = self.status_histogram.get(&200).copied().unwrap_or(0);
        self.availability = round2(successes as f64 / capacity as f64);
    }

    fn forget_status(&mut self, status_code: u16) {
        if let Some(count) = self.status_histogram.get_mut(&status_code) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.status_histogram.remove(&status_code);
            }
        }
    }

    pub fn history_interval(&self) -> Duration {
        self.history_interval
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn availability(&self) -> f64 {
        self.availability
    }

    pub fn status_histogram(&self) -> &BTreeMap<u16, usize> {
        &self.status_histogram
    }

    pub fn dns(&self) -> AvgMax {
        self.dns
    }

    pub fn connect(&self) -> AvgMax {
        self.connect
    }

    pub fn first_byte(&self) -> AvgMax {
        self.first_byte
    }

    pub fn total(&self) -> AvgMax {
        self.total
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            history_interval: self.history_interval,
            capacity: self.capacity(),
            samples: self.len(),
            availability: self.availability,
            status_histogram: self.status_histogram.clone(),
            dns: self.dns,
            connect: self.connect,
            first_byte: self.first_byte,
            total: self.total,
        }
    }
}

impl AvgMax {
    /// Average and maximum of the measured values, averaged over `capacity`.
    fn over(values: impl Iterator<Item = i64>, capacity: usize) -> Self {
        let (sum, max) = values
            .filter(|&v| v != UNMEASURED)
            .fold((0i64, 0i64), |(sum, max), v| (sum.saturating_add(v), max.max(v)));

        Self {
            avg: sum / capacity as i64,
            max,
        }
    }
}
