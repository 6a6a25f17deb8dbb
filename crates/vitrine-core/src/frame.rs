//! Query results as returned by the query execution backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Responses keyed by query refId.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDataResponse {
    #[serde(default)]
    pub responses: BTreeMap<String, DataResponse>,
}

impl QueryDataResponse {
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Merge another response into this one. Later refIds replace earlier ones.
    pub fn merge(&mut self, other: QueryDataResponse) {
        self.responses.extend(other.responses);
    }
}

/// Result of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub frames: Vec<DataFrame>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub values: Vec<Value>,
}

/// Frame metadata.
///
/// `executed_query_string` and `custom` are backend diagnostics; everything
/// else the backend sends is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_query_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
