//! Time expressions and time range resolution.
//!
//! Accepted expressions:
//! - `now`
//! - `now-<duration>` / `now+<duration>` where the duration is anything
//!   `humantime` understands (`30s`, `6h`, `90d`, `2w`, `1M`, `1y`)
//! - any of the above followed by `/<unit>` (`s`, `m`, `h`, `d`, `w`) to round
//!   down to the start of the unit, or up to its end for the `to` side
//! - epoch milliseconds (`1668000000000`)
//! - RFC 3339 (`2022-11-09T12:00:00Z`)

use chrono::{DateTime, Duration, Utc};
use vitrine_core::{Dashboard, TimeRange, TimeSettings, config::QueryConfig};

use crate::error::TimeRangeError;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Resolve a `from`/`to` pair against `now`.
pub fn parse_time_range(
    from: &str,
    to: &str,
    now: DateTime<Utc>,
) -> Result<TimeRange, TimeRangeError> {
    let start = parse_expr(from, "from", now, false)?;
    let end = parse_expr(to, "to", now, true)?;
    if start > end {
        return Err(TimeRangeError::Inverted {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(TimeRange::new(start, end))
}

/// Pick the time settings a public dashboard is served with.
///
/// The public dashboard's own settings win when both ends are set, then the
/// dashboard's `time` block, then the configured default.
pub fn resolve_time_settings(
    public: &TimeSettings,
    dashboard: &Dashboard,
    config: &QueryConfig,
) -> TimeSettings {
    if public.is_complete() {
        return public.clone();
    }
    dashboard
        .time_settings()
        .filter(TimeSettings::is_complete)
        .unwrap_or_else(|| TimeSettings::new(&config.default_from, &config.default_to))
}

fn parse_expr(
    expr: &str,
    side: &'static str,
    now: DateTime<Utc>,
    round_up: bool,
) -> Result<DateTime<Utc>, TimeRangeError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(TimeRangeError::Empty(side));
    }

    if let Some(relative) = trimmed.strip_prefix("now") {
        return parse_relative(trimmed, relative, now, round_up);
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| TimeRangeError::Invalid(expr.to_string()));
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeRangeError::Invalid(expr.to_string()))
}

fn parse_relative(
    expr: &str,
    relative: &str,
    now: DateTime<Utc>,
    round_up: bool,
) -> Result<DateTime<Utc>, TimeRangeError> {
    let (offset, unit) = match relative.split_once('/') {
        Some((offset, unit)) => (offset, Some(unit)),
        None => (relative, None),
    };

    let mut at = now;
    if !offset.is_empty() {
        let (sign, duration) = if let Some(rest) = offset.strip_prefix('-') {
            (-1, rest)
        } else if let Some(rest) = offset.strip_prefix('+') {
            (1, rest)
        } else {
            return Err(TimeRangeError::Invalid(expr.to_string()));
        };
        let std_duration =
            humantime::parse_duration(duration).map_err(|source| TimeRangeError::Duration {
                expr: expr.to_string(),
                source,
            })?;
        let delta = Duration::from_std(std_duration)
            .map_err(|_| TimeRangeError::Invalid(expr.to_string()))?;
        at = if sign < 0 {
            at.checked_sub_signed(delta)
        } else {
            at.checked_add_signed(delta)
        }
        .ok_or_else(|| TimeRangeError::Invalid(expr.to_string()))?;
    }

    match unit {
        Some(unit) => round_to_unit(expr, at, unit, round_up),
        None => Ok(at),
    }
}

fn round_to_unit(
    expr: &str,
    at: DateTime<Utc>,
    unit: &str,
    round_up: bool,
) -> Result<DateTime<Utc>, TimeRangeError> {
    let step = match unit {
        "s" => MS_PER_SECOND,
        "m" => MS_PER_MINUTE,
        "h" => MS_PER_HOUR,
        "d" => MS_PER_DAY,
        "w" => MS_PER_WEEK,
        _ => {
            return Err(TimeRangeError::UnknownUnit {
                expr: expr.to_string(),
                unit: unit.to_string(),
            });
        }
    };

    let ms = at.timestamp_millis();
    // Weeks start on Monday; the epoch fell on a Thursday.
    let origin = if step == MS_PER_WEEK { -3 * MS_PER_DAY } else { 0 };
    let start = ms - (ms - origin).rem_euclid(step);
    let rounded = if round_up { start + step - 1 } else { start };

    DateTime::from_timestamp_millis(rounded).ok_or_else(|| TimeRangeError::Invalid(expr.to_string()))
}
