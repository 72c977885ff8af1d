//! Lookback window computation.

use crate::models::IntervalTimeConfiguration;

/// Inclusive time range in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRangeBounds {
    /// Lower bound
    pub min: i64,
    /// Upper bound, the reference time
    pub max: i64,
}

/// Computes the window of length `interval` ending at `reference_ms`.
///
/// The lower bound saturates instead of overflowing for very long intervals.
pub fn time_range_bounds(interval: &IntervalTimeConfiguration, reference_ms: i64) -> TimeRangeBounds {
    TimeRangeBounds {
        min: reference_ms.saturating_sub(interval.to_millis()),
        max: reference_ms,
    }
}
