//! Annotation definitions (declared in the dashboard) and annotation results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::DatasourceRef;

/// Uid of the built-in annotation datasource.
pub const BUILT_IN_ANNOTATION_DATASOURCE_UID: &str = "grafana";

/// Name the built-in source had before datasource references became objects.
pub const LEGACY_BUILT_IN_ANNOTATION_DATASOURCE: &str = "-- Grafana --";

/// One entry of the dashboard's `annotations.list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashAnnotation {
    /// Raw datasource reference (object, or bare string in old dashboards).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<Value>,

    #[serde(default)]
    pub enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<AnnotationTarget>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Fields Vitrine does not interpret (`builtIn`, `hide`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DashAnnotation {
    pub fn datasource_ref(&self) -> Option<DatasourceRef> {
        self.datasource.as_ref().and_then(DatasourceRef::from_value)
    }

    /// Served by the built-in annotation store rather than a query datasource.
    pub fn is_built_in(&self) -> bool {
        self.datasource_ref()
            .and_then(|ds| ds.uid)
            .is_some_and(|uid| {
                uid == BUILT_IN_ANNOTATION_DATASOURCE_UID
                    || uid == LEGACY_BUILT_IN_ANNOTATION_DATASOURCE
            })
    }

    /// Filters native events by tag.
    pub fn is_tags_query(&self) -> bool {
        self.target.as_ref().is_some_and(|t| t.kind == "tags")
    }

    /// Matches every native event of the dashboard.
    pub fn is_dashboard_query(&self) -> bool {
        self.kind.as_deref() == Some("dashboard")
            || self.target.as_ref().is_some_and(|t| t.kind == "dashboard")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationTarget {
    #[serde(default)]
    pub limit: i64,

    #[serde(default)]
    pub match_any: bool,

    #[serde(default)]
    pub tags: Option<Vec<String>>,

    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Time window requested by the anonymous caller, in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationsQuery {
    #[serde(default)]
    pub from: i64,
    #[serde(default)]
    pub to: i64,
}

/// Query sent to the annotation repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationQuery {
    pub from: i64,
    pub to: i64,
    pub org_id: i64,
    /// Restricts results to one dashboard; zero for tag queries.
    pub dashboard_id: i64,
    pub dashboard_uid: Option<String>,
    pub tags: Vec<String>,
    pub match_any: bool,
    pub limit: i64,
}

/// A native annotation as stored by the annotation repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationItem {
    pub id: i64,
    pub dashboard_id: i64,
    #[serde(default)]
    pub dashboard_uid: Option<String>,
    pub panel_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub time: i64,
    pub time_end: i64,
    #[serde(default)]
    pub text: String,
}

/// An annotation returned to the anonymous caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationEvent {
    pub id: i64,
    pub dashboard_id: i64,
    pub panel_id: i64,
    pub tags: Vec<String>,
    pub is_region: bool,
    pub text: String,
    pub color: String,
    pub time: i64,
    pub time_end: i64,
    /// The definition the event is attributed to.
    pub source: DashAnnotation,
}
