//! `vitrine safe-interval` - preview the resolution clamp.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vitrine_core::VitrineConfig;
use vitrine_query::{SafeRange, SafeRangeCalculator, TimeRangeError, parse_time_range};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeIntervalReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub duration_ms: i64,
    pub resolution: i64,
    #[serde(flatten)]
    pub safe: SafeRange,
}

pub fn compute(
    config: &VitrineConfig,
    from: &str,
    to: &str,
    interval_ms: i64,
    max_data_points: i64,
    now: DateTime<Utc>,
) -> Result<SafeIntervalReport, TimeRangeError> {
    let range = parse_time_range(from, to, now)?;
    let calculator = SafeRangeCalculator::new(config.query.safe_resolution);
    Ok(SafeIntervalReport {
        from: range.from,
        to: range.to,
        duration_ms: range.duration_ms(),
        resolution: calculator.resolution(),
        safe: calculator.calculate(interval_ms, max_data_points, &range),
    })
}

pub fn run(
    config: &VitrineConfig,
    from: &str,
    to: &str,
    interval_ms: i64,
    max_data_points: i64,
) -> anyhow::Result<()> {
    let report = compute(config, from, to, interval_ms, max_data_points, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
