//! Stored dashboard documents.
//!
//! A dashboard is owned by the dashboard persistence layer. Vitrine only reads
//! it: the JSON model in [`Dashboard::data`] is free-form and its panel/target
//! shape differs between schema versions, so nothing here assumes more than
//! the handful of top-level keys it reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::public_dashboard::TimeSettings;

/// A dashboard as returned by the dashboard store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Numeric id (used by the annotation repository).
    #[serde(default)]
    pub id: i64,

    /// Stable dashboard uid.
    pub uid: String,

    /// Owning organization.
    pub org_id: i64,

    /// Dashboard title (copied from the JSON model on construction).
    #[serde(default)]
    pub title: String,

    /// The raw JSON model.
    pub data: Value,
}

impl Dashboard {
    /// Create a dashboard from its JSON model.
    pub fn new(uid: impl Into<String>, org_id: i64, data: Value) -> Self {
        let title = data
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id: 0,
            uid: uid.into(),
            org_id,
            title,
            data,
        }
    }

    /// Set the numeric id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Whether the dashboard declares template variables.
    ///
    /// Template variables are not supported in public mode: their values would
    /// come from the anonymous caller.
    pub fn has_template_variables(&self) -> bool {
        self.data
            .pointer("/templating/list")
            .and_then(Value::as_array)
            .is_some_and(|list| !list.is_empty())
    }

    /// The dashboard's own time range (`time.from` / `time.to`), if both are set.
    pub fn time_settings(&self) -> Option<TimeSettings> {
        let from = self.data.pointer("/time/from").and_then(Value::as_str)?;
        let to = self.data.pointer("/time/to").and_then(Value::as_str)?;
        Some(TimeSettings::new(from, to))
    }

    /// The raw `annotations.list` entries, if present.
    pub fn annotation_list(&self) -> Option<&Vec<Value>> {
        self.data
            .pointer("/annotations/list")
            .and_then(Value::as_array)
    }
}
