//! Safe interval and max data points for anonymous queries.
//!
//! An anonymous caller picks `intervalMs` and `maxDataPoints`. Left alone, a
//! tiny interval over a long range asks the backend for millions of points.
//! [`SafeRangeCalculator`] derives the smallest interval that keeps the range
//! under the point ceiling and overrides the request whenever the request is
//! finer than that.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vitrine_core::TimeRange;

/// Default point ceiling for one query.
pub const DEFAULT_SAFE_RESOLUTION: i64 = 11_000;

/// Interval and max data points sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeRange {
    pub interval_ms: i64,
    pub max_data_points: i64,
}

/// Computes [`SafeRange`]s against a fixed point ceiling.
#[derive(Debug, Clone, Copy)]
pub struct SafeRangeCalculator {
    resolution: i64,
}

impl Default for SafeRangeCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_RESOLUTION)
    }
}

impl SafeRangeCalculator {
    /// A calculator capping queries at `resolution` points. Non-positive
    /// values fall back to [`DEFAULT_SAFE_RESOLUTION`].
    pub fn new(resolution: i64) -> Self {
        let resolution = if resolution > 0 {
            resolution
        } else {
            DEFAULT_SAFE_RESOLUTION
        };
        Self { resolution }
    }

    pub fn resolution(&self) -> i64 {
        self.resolution
    }

    /// Smallest interval, rounded to a nice step, that spans `range` in about
    /// `resolution` points.
    pub fn safe_interval_ms(&self, range: &TimeRange) -> i64 {
        round_interval(range.duration_ms() / self.resolution)
    }

    /// Clamp the requested interval and max data points.
    ///
    /// A request strictly coarser than the safe interval is kept as is, with
    /// its max data points capped at the ceiling. Anything else, including
    /// zero or negative values, gets the safe interval and the ceiling.
    pub fn calculate(
        &self,
        requested_interval_ms: i64,
        requested_max_data_points: i64,
        range: &TimeRange,
    ) -> SafeRange {
        let safe_interval_ms = self.safe_interval_ms(range);

        if requested_interval_ms > safe_interval_ms {
            let max_data_points = if requested_max_data_points > 0 {
                requested_max_data_points.min(self.resolution)
            } else {
                self.resolution
            };
            return SafeRange {
                interval_ms: requested_interval_ms,
                max_data_points,
            };
        }

        debug!(
            requested_interval_ms,
            safe_interval_ms,
            resolution = self.resolution,
            "Clamping query interval"
        );
        SafeRange {
            interval_ms: safe_interval_ms,
            max_data_points: self.resolution,
        }
    }
}

/// Round an interval in milliseconds to a human-friendly step.
///
/// Steps run from 1ms through seconds, minutes, hours and days up to one year.
/// The result is never below 1ms.
pub fn round_interval(interval_ms: i64) -> i64 {
    const SECOND: i64 = 1_000;
    const MINUTE: i64 = 60 * SECOND;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    // (upper bound inclusive, step)
    const STEPS: &[(i64, i64)] = &[
        (10, 1),
        (15, 10),
        (35, 20),
        (75, 50),
        (150, 100),
        (350, 200),
        (750, 500),
        (1_500, SECOND),
        (3_500, 2 * SECOND),
        (7_500, 5 * SECOND),
        (12_500, 10 * SECOND),
        (17_500, 15 * SECOND),
        (25_000, 20 * SECOND),
        (45_000, 30 * SECOND),
        (90_000, MINUTE),
        (210_000, 2 * MINUTE),
        (450_000, 5 * MINUTE),
        (750_000, 10 * MINUTE),
        (1_050_000, 15 * MINUTE),
        (1_500_000, 20 * MINUTE),
        (2_700_000, 30 * MINUTE),
        (5_400_000, HOUR),
        (9_000_000, 2 * HOUR),
        (16_200_000, 3 * HOUR),
        (32_400_000, 6 * HOUR),
        (86_400_000, 12 * HOUR),
        (172_800_000, DAY),
        (604_800_000, DAY),
        (1_814_400_000, 7 * DAY),
    ];

    if let Some(&(_, step)) = STEPS.iter().find(|(bound, _)| interval_ms <= *bound) {
        return step;
    }
    if interval_ms < 3_628_800_000 {
        30 * DAY
    } else {
        365 * DAY
    }
}
