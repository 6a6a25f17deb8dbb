//! # vitrine-query
//!
//! The pure part of the public query path. Nothing here performs I/O.
//!
//! - [`extractor`]: walks a dashboard's panel tree into per-panel query lists
//! - [`grouper`]: partitions a panel's queries by datasource uid
//! - [`timerange`]: resolves `now-6h` style expressions into absolute ranges
//! - [`interval`]: caps interval and max data points for a time range
//! - [`sanitize`]: strips backend diagnostics from result frames

pub mod error;
pub mod extractor;
pub mod grouper;
pub mod interval;
pub mod sanitize;
pub mod timerange;

pub use error::TimeRangeError;
pub use extractor::{DashboardQueries, group_queries_by_panel_id, unique_datasource_uids};
pub use grouper::group_queries_by_datasource;
pub use interval::{DEFAULT_SAFE_RESOLUTION, SafeRange, SafeRangeCalculator, round_interval};
pub use sanitize::sanitize_metadata_from_query_data;
pub use timerange::{parse_time_range, resolve_time_settings};
