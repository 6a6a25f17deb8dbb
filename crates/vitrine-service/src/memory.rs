//! In-memory collaborators.
//!
//! Process-local implementations of the store, annotation and query traits.
//! They back the service tests and the CLI, and serve as a reference for what
//! an adapter has to honour.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use vitrine_core::{
    AnnotationItem, AnnotationQuery, DataFrame, DataResponse, Dashboard, Field, FrameMeta,
    MetricRequest, PublicDashboard, QueryDataResponse,
};
use vitrine_policy::ExecutionContext;
use vitrine_policy::anonymous::{ACTION_ANNOTATIONS_READ, SCOPE_ANNOTATIONS_TYPE_DASHBOARD};

use crate::store::{AnnotationRepository, DashboardStore, PublicDashboardStore, QueryDataService};

fn poisoned(what: &str) -> anyhow::Error {
    anyhow!("{what} lock poisoned")
}

// =============================================================================
// DASHBOARDS
// =============================================================================

/// Dashboards keyed by `(org_id, uid)`.
#[derive(Debug, Default)]
pub struct InMemoryDashboardStore {
    dashboards: RwLock<HashMap<(i64, String), Dashboard>>,
}

impl InMemoryDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dashboards(dashboards: impl IntoIterator<Item = Dashboard>) -> Self {
        let map = dashboards
            .into_iter()
            .map(|d| ((d.org_id, d.uid.clone()), d))
            .collect();
        Self {
            dashboards: RwLock::new(map),
        }
    }

    /// Remove a dashboard, leaving any public dashboard pointing at it.
    pub fn remove(&self, org_id: i64, uid: &str) -> anyhow::Result<Option<Dashboard>> {
        let mut dashboards = self.dashboards.write().map_err(|_| poisoned("dashboard"))?;
        Ok(dashboards.remove(&(org_id, uid.to_string())))
    }
}

#[async_trait]
impl DashboardStore for InMemoryDashboardStore {
    async fn find_dashboard(&self, org_id: i64, uid: &str) -> anyhow::Result<Option<Dashboard>> {
        let dashboards = self.dashboards.read().map_err(|_| poisoned("dashboard"))?;
        Ok(dashboards.get(&(org_id, uid.to_string())).cloned())
    }

    async fn save_dashboard(&self, dashboard: Dashboard) -> anyhow::Result<Dashboard> {
        let mut dashboards = self.dashboards.write().map_err(|_| poisoned("dashboard"))?;
        dashboards.insert((dashboard.org_id, dashboard.uid.clone()), dashboard.clone());
        Ok(dashboard)
    }
}

// =============================================================================
// PUBLIC DASHBOARDS
// =============================================================================

/// Public dashboard records keyed by uid.
#[derive(Debug, Default)]
pub struct InMemoryPublicDashboardStore {
    records: RwLock<BTreeMap<String, PublicDashboard>>,
}

impl InMemoryPublicDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as-is, replacing any record with the same uid.
    pub fn insert(&self, record: PublicDashboard) -> anyhow::Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned("public dashboard"))?;
        records.insert(record.uid.clone(), record);
        Ok(())
    }

    /// All records ordered by uid.
    pub fn records(&self) -> Vec<PublicDashboard> {
        self.records
            .read()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn find_where(
        &self,
        predicate: impl Fn(&PublicDashboard) -> bool,
    ) -> anyhow::Result<Option<PublicDashboard>> {
        let records = self.records.read().map_err(|_| poisoned("public dashboard"))?;
        Ok(records.values().find(|r| predicate(r)).cloned())
    }
}

#[async_trait]
impl PublicDashboardStore for InMemoryPublicDashboardStore {
    async fn find(&self, uid: &str) -> anyhow::Result<Option<PublicDashboard>> {
        let records = self.records.read().map_err(|_| poisoned("public dashboard"))?;
        Ok(records.get(uid).cloned())
    }

    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Option<PublicDashboard>> {
        self.find_where(|r| r.access_token == access_token)
    }

    async fn find_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> anyhow::Result<Option<PublicDashboard>> {
        self.find_where(|r| r.org_id == org_id && r.dashboard_uid == dashboard_uid)
    }

    async fn find_all(&self, org_id: i64) -> anyhow::Result<Vec<PublicDashboard>> {
        let records = self.records.read().map_err(|_| poisoned("public dashboard"))?;
        Ok(records
            .values()
            .filter(|r| r.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn save(&self, public_dashboard: &PublicDashboard) -> anyhow::Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned("public dashboard"))?;
        if records.contains_key(&public_dashboard.uid) {
            bail!("public dashboard {} already exists", public_dashboard.uid);
        }
        if records
            .values()
            .any(|r| r.access_token == public_dashboard.access_token)
        {
            bail!("access token already in use");
        }
        records.insert(public_dashboard.uid.clone(), public_dashboard.clone());
        Ok(())
    }

    async fn update(&self, public_dashboard: &PublicDashboard) -> anyhow::Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned("public dashboard"))?;
        let Some(stored) = records.get_mut(&public_dashboard.uid) else {
            bail!("public dashboard {} does not exist", public_dashboard.uid);
        };
        stored.is_enabled = public_dashboard.is_enabled;
        stored.annotations_enabled = public_dashboard.annotations_enabled;
        stored.time_settings = public_dashboard.time_settings.clone();
        stored.updated_by = public_dashboard.updated_by;
        stored.updated_at = public_dashboard.updated_at;
        Ok(())
    }

    async fn exists_enabled_by_access_token(&self, access_token: &str) -> anyhow::Result<bool> {
        Ok(self
            .find_where(|r| r.is_enabled && r.access_token == access_token)?
            .is_some())
    }

    async fn exists_enabled_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> anyhow::Result<bool> {
        Ok(self
            .find_where(|r| r.is_enabled && r.org_id == org_id && r.dashboard_uid == dashboard_uid)?
            .is_some())
    }

    async fn get_org_id_by_access_token(&self, access_token: &str) -> anyhow::Result<Option<i64>> {
        Ok(self
            .find_where(|r| r.is_enabled && r.access_token == access_token)?
            .map(|r| r.org_id))
    }
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// Native annotations with the filtering a real repository applies.
#[derive(Debug, Default)]
pub struct InMemoryAnnotationRepository {
    items: RwLock<Vec<AnnotationItem>>,
}

impl InMemoryAnnotationRepository {
    pub fn new(items: Vec<AnnotationItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn insert(&self, item: AnnotationItem) -> anyhow::Result<()> {
        let mut items = self.items.write().map_err(|_| poisoned("annotation"))?;
        items.push(item);
        Ok(())
    }
}

fn matches_query(item: &AnnotationItem, query: &AnnotationQuery) -> bool {
    if query.dashboard_id != 0 && item.dashboard_id != query.dashboard_id {
        return false;
    }
    if let Some(uid) = &query.dashboard_uid {
        if item.dashboard_uid.as_deref().is_some_and(|item_uid| item_uid != uid) {
            return false;
        }
    }
    if !query.tags.is_empty() {
        let has = |tag: &String| item.tags.contains(tag);
        let tagged = if query.match_any {
            query.tags.iter().any(has)
        } else {
            query.tags.iter().all(has)
        };
        if !tagged {
            return false;
        }
    }
    // overlap with [from, to] when a window is given
    let end = item.time_end.max(item.time);
    if query.to > 0 && item.time > query.to {
        return false;
    }
    if query.from > 0 && end < query.from {
        return false;
    }
    true
}

#[async_trait]
impl AnnotationRepository for InMemoryAnnotationRepository {
    async fn find(
        &self,
        query: &AnnotationQuery,
        context: &ExecutionContext,
    ) -> anyhow::Result<Vec<AnnotationItem>> {
        if !context.has_permission(ACTION_ANNOTATIONS_READ, SCOPE_ANNOTATIONS_TYPE_DASHBOARD) {
            return Ok(Vec::new());
        }
        let items = self.items.read().map_err(|_| poisoned("annotation"))?;
        let limit = usize::try_from(query.limit).unwrap_or(0);
        let matching = items.iter().filter(|item| matches_query(item, query)).cloned();
        Ok(if limit > 0 {
            matching.take(limit).collect()
        } else {
            matching.collect()
        })
    }
}

// =============================================================================
// QUERY EXECUTION
// =============================================================================

/// Answers every query with one synthetic frame and records each request.
///
/// Frames carry backend diagnostics (`executedQueryString`, `custom`) the way
/// real backends do, so callers can observe sanitization.
#[derive(Debug, Default)]
pub struct EchoQueryDataService {
    requests: RwLock<Vec<MetricRequest>>,
}

impl EchoQueryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<MetricRequest> {
        self.requests
            .read()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryDataService for EchoQueryDataService {
    async fn execute(
        &self,
        request: &MetricRequest,
        context: &ExecutionContext,
    ) -> anyhow::Result<QueryDataResponse> {
        self.requests
            .write()
            .map_err(|_| poisoned("request"))?
            .push(request.clone());

        let mut response = QueryDataResponse::default();
        for query in &request.queries {
            let ref_id = query.ref_id().unwrap_or_default().to_string();
            let datasource = query.datasource_uid().unwrap_or_default();
            if !context.can_query_datasource(&datasource) {
                bail!("datasource {datasource} is not granted");
            }

            let frame = DataFrame {
                name: ref_id.clone(),
                fields: vec![
                    Field {
                        name: "time".to_string(),
                        values: vec![Value::from(request.range.from.timestamp_millis())],
                        ..Default::default()
                    },
                    Field {
                        name: "value".to_string(),
                        values: vec![Value::from(1)],
                        ..Default::default()
                    },
                ],
                meta: Some(FrameMeta {
                    executed_query_string: Some(format!("{datasource}:{ref_id}")),
                    custom: Some(json!({"intervalMs": query.interval_ms()})),
                    ..Default::default()
                }),
            };
            response.responses.insert(
                ref_id,
                DataResponse {
                    frames: vec![frame],
                    error: None,
                },
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, tags: &[&str], time: i64, time_end: i64) -> AnnotationItem {
        AnnotationItem {
            id,
            dashboard_id: 1,
            dashboard_uid: Some("dash".to_string()),
            panel_id: 2,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            time,
            time_end,
            text: String::new(),
        }
    }

    fn query() -> AnnotationQuery {
        AnnotationQuery {
            org_id: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_tag_matching() {
        let annotation = item(1, &["a", "b"], 10, 10);

        let all = AnnotationQuery {
            tags: vec!["a".to_string(), "c".to_string()],
            ..query()
        };
        assert!(!matches_query(&annotation, &all));

        let any = AnnotationQuery {
            match_any: true,
            ..all
        };
        assert!(matches_query(&annotation, &any));
    }

    #[test]
    fn test_time_window_overlap() {
        let region = item(1, &[], 10, 20);
        let window = |from, to| AnnotationQuery {
            from,
            to,
            ..query()
        };

        assert!(matches_query(&region, &window(15, 30)));
        assert!(matches_query(&region, &window(0, 0)));
        assert!(!matches_query(&region, &window(21, 30)));
        assert!(!matches_query(&region, &window(1, 9)));
    }

    #[test]
    fn test_dashboard_filter() {
        let annotation = item(1, &[], 10, 10);
        let other = AnnotationQuery {
            dashboard_id: 2,
            ..query()
        };
        let same = AnnotationQuery {
            dashboard_id: 1,
            dashboard_uid: Some("dash".to_string()),
            ..query()
        };

        assert!(!matches_query(&annotation, &other));
        assert!(matches_query(&annotation, &same));
    }

    #[tokio::test]
    async fn test_update_keeps_identity_fields() {
        let store = InMemoryPublicDashboardStore::new();
        let original = PublicDashboard {
            uid: "pd".to_string(),
            dashboard_uid: "dash".to_string(),
            org_id: 1,
            access_token: "token".to_string(),
            is_enabled: false,
            annotations_enabled: false,
            time_settings: Default::default(),
            created_by: 1,
            created_at: chrono::Utc::now(),
            updated_by: None,
            updated_at: None,
        };
        store.save(&original).await.unwrap();

        let changed = PublicDashboard {
            dashboard_uid: "other".to_string(),
            access_token: "stolen".to_string(),
            is_enabled: true,
            updated_by: Some(2),
            ..original.clone()
        };
        store.update(&changed).await.unwrap();

        let stored = store.find("pd").await.unwrap().unwrap();
        assert_eq!(stored.dashboard_uid, "dash");
        assert_eq!(stored.access_token, "token");
        assert!(stored.is_enabled);
        assert_eq!(stored.updated_by, Some(2));
        assert!(store.save(&original).await.is_err());
    }
}
