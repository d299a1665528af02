//! Metrics module for webwatch.
//!
//! Turns the stream of probe samples for one URL into bounded rolling
//! statistics (a short and a long window) and an availability alert.

mod alert;
mod models;
mod ring;
mod url_metrics;
mod window;

pub use alert::*;
pub use models::*;
pub use ring::*;
pub use url_metrics::*;
pub use window::*;

use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while sizing a window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapacityError {
    #[error("polling interval must be greater than zero")]
    ZeroPollingInterval,
    #[error("polling interval {polling:?} is longer than history interval {history:?}")]
    PollingExceedsHistory { polling: Duration, history: Duration },
}

/// Number of samples a window of `history` holds when polling every `polling`.
pub fn capacity_for(history: Duration, polling: Duration) -> Result<NonZeroUsize, CapacityError> {
    if polling.is_zero() {
        return Err(CapacityError::ZeroPollingInterval);
    }
    if polling > history {
        return Err(CapacityError::PollingExceedsHistory { polling, history });
    }

    let slots = (history.as_secs_f64() / polling.as_secs_f64()).round() as usize;
    NonZeroUsize::new(slots).ok_or(CapacityError::PollingExceedsHistory { polling, history })
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
