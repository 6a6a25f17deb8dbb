//! Per-panel query extraction.
//!
//! Dashboards are free-form JSON whose panel and target shapes changed across
//! schema versions. All of that branching happens here, once per request: the
//! rest of the query path only sees [`QueryDescriptor`]s with a normalized
//! `datasource` object, no `exemplar` hint and no hidden targets.
//!
//! Normalization rules for a target:
//! - `exemplar` is removed.
//! - A target without its own `datasource` inherits the panel's.
//! - A bare-string datasource (schema < 33) becomes
//!   `{"type": "public-ds", "uid": <string>}`.
//! - A target whose `hide` is literally `true` is dropped.
//!
//! Panels nested in a collapsed row (`"type": "row"` with its own `panels`
//! array) are extracted like top-level panels.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::debug;
use vitrine_core::{Dashboard, DatasourceRef, QueryDescriptor};

/// Queries of every panel of a dashboard, keyed by panel id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardQueries {
    panels: BTreeMap<i64, Vec<QueryDescriptor>>,
}

impl DashboardQueries {
    /// Extract from a stored dashboard.
    pub fn from_dashboard(dashboard: &Dashboard) -> Self {
        Self::from_value(&dashboard.data)
    }

    /// Extract from a raw dashboard JSON model.
    pub fn from_value(data: &Value) -> Self {
        Self {
            panels: group_queries_by_panel_id(data),
        }
    }

    /// Queries of one panel. `None` when the panel does not exist, an empty
    /// slice when it exists but has no visible queries.
    pub fn panel(&self, panel_id: i64) -> Option<&[QueryDescriptor]> {
        self.panels.get(&panel_id).map(Vec::as_slice)
    }

    pub fn panel_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.panels.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Every query of every panel, in panel id order.
    pub fn queries(&self) -> impl Iterator<Item = &QueryDescriptor> {
        self.panels.values().flatten()
    }

    /// Unique datasource uids referenced by the visible queries, sorted ascending.
    pub fn datasource_uids(&self) -> Vec<String> {
        self.queries()
            .filter_map(QueryDescriptor::datasource_uid)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<i64, Vec<QueryDescriptor>> {
        self.panels
    }
}

/// Map each panel id to its ordered list of visible, normalized queries.
///
/// A dashboard without a `panels` array yields an empty map. A panel without
/// `targets`, or whose targets are all hidden, maps to an empty list.
pub fn group_queries_by_panel_id(dashboard: &Value) -> BTreeMap<i64, Vec<QueryDescriptor>> {
    let mut result = BTreeMap::new();
    if let Some(panels) = dashboard.get("panels").and_then(Value::as_array) {
        collect_panels(panels, &mut result);
    }
    result
}

/// Unique datasource uids of a dashboard's visible queries, sorted ascending.
pub fn unique_datasource_uids(dashboard: &Value) -> Vec<String> {
    DashboardQueries::from_value(dashboard).datasource_uids()
}

fn collect_panels(panels: &[Value], result: &mut BTreeMap<i64, Vec<QueryDescriptor>>) {
    for panel in panels {
        let Some(panel_id) = panel.get("id").and_then(Value::as_i64) else {
            debug!("Skipping panel without a numeric id");
            continue;
        };

        result.insert(panel_id, panel_queries(panel));

        // collapsed row
        if let Some(nested) = panel.get("panels").and_then(Value::as_array) {
            collect_panels(nested, result);
        }
    }
}

fn panel_queries(panel: &Value) -> Vec<QueryDescriptor> {
    let Some(targets) = panel.get("targets").and_then(Value::as_array) else {
        return Vec::new();
    };

    let panel_datasource = panel.get("datasource").and_then(DatasourceRef::from_value);

    targets
        .iter()
        .filter_map(|target| match target {
            Value::Object(fields) => Some(QueryDescriptor::new(fields.clone())),
            _ => None,
        })
        .filter(|query| !query.is_hidden())
        .map(|query| normalize(query, panel_datasource.as_ref()))
        .collect()
}

fn normalize(mut query: QueryDescriptor, panel_datasource: Option<&DatasourceRef>) -> QueryDescriptor {
    query.remove(QueryDescriptor::EXEMPLAR);

    let own = query
        .get(QueryDescriptor::DATASOURCE)
        .filter(|value| !value.is_null())
        .cloned();

    match own {
        Some(Value::String(_)) => {
            if let Some(ds) = query.datasource() {
                query.insert(QueryDescriptor::DATASOURCE, ds.to_value());
            }
        }
        Some(_) => {}
        None => {
            if let Some(ds) = panel_datasource {
                query.insert(QueryDescriptor::DATASOURCE, ds.to_value());
            }
        }
    }

    query
}
