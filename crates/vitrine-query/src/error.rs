//! Error types for time range resolution.

use thiserror::Error;

/// Failure to turn a pair of time expressions into an absolute range.
#[derive(Debug, Error)]
pub enum TimeRangeError {
    #[error("empty time expression for '{0}'")]
    Empty(&'static str),

    #[error("invalid time expression '{0}'")]
    Invalid(String),

    #[error("invalid duration in '{expr}': {source}")]
    Duration {
        expr: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("unknown rounding unit '{unit}' in '{expr}'")]
    UnknownUnit { expr: String, unit: String },

    #[error("time range starts after it ends ({from} > {to})")]
    Inverted { from: String, to: String },
}
