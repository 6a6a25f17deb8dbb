//! Annotation resolution for public dashboards.
//!
//! Only definitions served by the built-in annotation store take part. Each
//! enabled one is turned into a repository query:
//!
//! - dashboard type: every native event of this dashboard, attributed to the
//!   panel it was created on
//! - tags type: native events of the organization carrying the definition's
//!   tags, shown on every panel (`panel_id` 0)
//!
//! Events are deduplicated by id. A tags-type match replaces whatever was
//! recorded for the same id before; a dashboard-type match only fills an empty
//! slot. Output keeps the order in which ids were first seen.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use vitrine_core::{
    AnnotationEvent, AnnotationItem, AnnotationQuery, AnnotationsQuery, DashAnnotation, Dashboard,
};
use vitrine_policy::ExecutionContext;

use crate::error::{PublicDashboardError, Result};
use crate::store::AnnotationRepository;

/// Repository limit used when a definition does not set one.
pub const DEFAULT_ANNOTATION_LIMIT: i64 = 100;

/// How a definition selects native events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Dashboard,
    Tags,
}

/// Resolves the annotation events of a public dashboard.
#[derive(Clone)]
pub struct AnnotationResolver {
    repository: Arc<dyn AnnotationRepository>,
}

impl AnnotationResolver {
    pub fn new(repository: Arc<dyn AnnotationRepository>) -> Self {
        Self { repository }
    }

    /// Events for `dashboard` within `query`, read on behalf of `context`.
    ///
    /// A dashboard without an `annotations.list` yields no events. Any
    /// repository failure aborts the whole resolution.
    pub async fn resolve(
        &self,
        dashboard: &Dashboard,
        query: &AnnotationsQuery,
        context: &ExecutionContext,
    ) -> Result<Vec<AnnotationEvent>> {
        let Some(list) = dashboard.annotation_list() else {
            debug!(dashboard_uid = %dashboard.uid, "Dashboard declares no annotations");
            return Ok(Vec::new());
        };

        let mut events: Vec<AnnotationEvent> = Vec::new();
        let mut positions: HashMap<i64, usize> = HashMap::new();

        for definition in parse_definitions(&dashboard.uid, list) {
            let Some(selection) = selection(&definition) else {
                continue;
            };

            let repo_query = repository_query(dashboard, query, &definition, selection);
            let items = self
                .repository
                .find(&repo_query, context)
                .await
                .map_err(|source| {
                    PublicDashboardError::upstream("finding dashboard annotations", source)
                })?;

            debug!(
                dashboard_uid = %dashboard.uid,
                definition = definition.name.as_deref().unwrap_or_default(),
                ?selection,
                items = items.len(),
                "Queried annotation repository"
            );

            for item in items {
                let event = to_event(item, &definition, selection);
                match positions.get(&event.id) {
                    Some(&index) if selection == Selection::Tags => events[index] = event,
                    Some(_) => {}
                    None => {
                        positions.insert(event.id, events.len());
                        events.push(event);
                    }
                }
            }
        }

        Ok(events)
    }
}

fn parse_definitions(dashboard_uid: &str, list: &[Value]) -> Vec<DashAnnotation> {
    list.iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            serde_json::from_value::<DashAnnotation>(raw.clone())
                .map_err(|err| {
                    warn!(dashboard_uid, index, error = %err, "Skipping malformed annotation definition");
                })
                .ok()
        })
        .collect()
}

/// `None` for definitions that take no part: disabled, query-backed, or
/// without a target this path understands.
fn selection(definition: &DashAnnotation) -> Option<Selection> {
    if !definition.enable || !definition.is_built_in() {
        return None;
    }
    definition.target.as_ref()?;
    if definition.is_tags_query() {
        Some(Selection::Tags)
    } else if definition.is_dashboard_query() {
        Some(Selection::Dashboard)
    } else {
        None
    }
}

fn repository_query(
    dashboard: &Dashboard,
    query: &AnnotationsQuery,
    definition: &DashAnnotation,
    selection: Selection,
) -> AnnotationQuery {
    let target = definition.target.clone().unwrap_or_default();
    let limit = if target.limit > 0 {
        target.limit
    } else {
        DEFAULT_ANNOTATION_LIMIT
    };

    let mut repo_query = AnnotationQuery {
        from: query.from,
        to: query.to,
        org_id: dashboard.org_id,
        dashboard_id: 0,
        dashboard_uid: None,
        tags: Vec::new(),
        match_any: target.match_any,
        limit,
    };

    match selection {
        Selection::Dashboard => {
            repo_query.dashboard_id = dashboard.id;
            repo_query.dashboard_uid = Some(dashboard.uid.clone());
        }
        Selection::Tags => repo_query.tags = target.tags.unwrap_or_default(),
    }
    repo_query
}

fn to_event(item: AnnotationItem, definition: &DashAnnotation, selection: Selection) -> AnnotationEvent {
    let panel_id = match selection {
        Selection::Dashboard => item.panel_id,
        Selection::Tags => 0,
    };
    AnnotationEvent {
        id: item.id,
        dashboard_id: item.dashboard_id,
        panel_id,
        tags: item.tags,
        is_region: item.time_end > 0 && item.time != item.time_end,
        text: item.text,
        color: definition.icon_color.clone().unwrap_or_default(),
        time: item.time,
        time_end: item.time_end,
        source: definition.clone(),
    }
}
