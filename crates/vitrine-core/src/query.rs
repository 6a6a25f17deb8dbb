//! Normalized query definitions.
//!
//! Panel targets are backend-specific JSON objects. [`QueryDescriptor`] keeps
//! every field as-is and exposes typed accessors for the few keys Vitrine
//! itself reads or writes (`datasource`, `refId`, `hide`, `intervalMs`,
//! `maxDataPoints`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Datasource type assigned to references recovered from a bare uid string.
pub const PUBLIC_DATASOURCE_TYPE: &str = "public-ds";

/// A `{type, uid}` datasource reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasourceRef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl DatasourceRef {
    pub fn new(kind: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            uid: Some(uid.into()),
        }
    }

    /// Read a datasource reference from raw dashboard JSON.
    ///
    /// Objects are read field by field. A bare string (pre-object schema) is
    /// taken as the uid and typed [`PUBLIC_DATASOURCE_TYPE`], since the real
    /// type cannot be recovered from the string. Anything else is `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(uid) if !uid.is_empty() => {
                Some(Self::new(PUBLIC_DATASOURCE_TYPE, uid.as_str()))
            }
            Value::Object(map) => Some(Self {
                kind: map.get("type").and_then(Value::as_str).map(str::to_string),
                uid: map.get("uid").and_then(Value::as_str).map(str::to_string),
            }),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One normalized panel target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryDescriptor(Map<String, Value>);

impl QueryDescriptor {
    pub const DATASOURCE: &'static str = "datasource";
    pub const REF_ID: &'static str = "refId";
    pub const HIDE: &'static str = "hide";
    pub const EXEMPLAR: &'static str = "exemplar";
    pub const INTERVAL_MS: &'static str = "intervalMs";
    pub const MAX_DATA_POINTS: &'static str = "maxDataPoints";

    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn ref_id(&self) -> Option<&str> {
        self.0.get(Self::REF_ID).and_then(Value::as_str)
    }

    pub fn datasource(&self) -> Option<DatasourceRef> {
        self.0.get(Self::DATASOURCE).and_then(DatasourceRef::from_value)
    }

    pub fn datasource_uid(&self) -> Option<String> {
        self.datasource()
            .and_then(|ds| ds.uid)
            .filter(|uid| !uid.is_empty())
    }

    /// Only a literal boolean `true` hides a target.
    pub fn is_hidden(&self) -> bool {
        matches!(self.0.get(Self::HIDE), Some(Value::Bool(true)))
    }

    pub fn interval_ms(&self) -> Option<i64> {
        self.0.get(Self::INTERVAL_MS).and_then(Value::as_i64)
    }

    pub fn max_data_points(&self) -> Option<i64> {
        self.0.get(Self::MAX_DATA_POINTS).and_then(Value::as_i64)
    }

    pub fn set_interval_ms(&mut self, interval_ms: i64) {
        self.insert(Self::INTERVAL_MS, Value::from(interval_ms));
    }

    pub fn set_max_data_points(&mut self, max_data_points: i64) {
        self.insert(Self::MAX_DATA_POINTS, Value::from(max_data_points));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for QueryDescriptor {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// An absolute time range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Length of the range in milliseconds, never negative.
    pub fn duration_ms(&self) -> i64 {
        (self.to - self.from).num_milliseconds().max(0)
    }
}

/// The query set dispatched for one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRequest {
    /// `from` expression the range was resolved from.
    pub from: String,
    /// `to` expression the range was resolved from.
    pub to: String,
    /// The resolved range.
    pub range: TimeRange,
    pub queries: Vec<QueryDescriptor>,
}
