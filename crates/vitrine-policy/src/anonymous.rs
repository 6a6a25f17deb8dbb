//! Anonymous execution context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vitrine_core::Dashboard;
use vitrine_query::DashboardQueries;

/// Run queries against a datasource.
pub const ACTION_DATASOURCES_QUERY: &str = "datasources:query";
/// Read a datasource's definition.
pub const ACTION_DATASOURCES_READ: &str = "datasources:read";
/// Read dashboards.
pub const ACTION_DASHBOARDS_READ: &str = "dashboards:read";
/// Read annotations.
pub const ACTION_ANNOTATIONS_READ: &str = "annotations:read";

pub const SCOPE_DASHBOARDS_ALL: &str = "dashboards:*";
pub const SCOPE_ANNOTATIONS_TYPE_DASHBOARD: &str = "annotations:type:dashboard";

const DATASOURCE_SCOPE_PREFIX: &str = "datasources:uid:";

/// Scope granting access to one datasource.
pub fn datasource_scope(uid: &str) -> String {
    format!("{DATASOURCE_SCOPE_PREFIX}{uid}")
}

/// Request-scoped authorization for an anonymous caller.
///
/// Maps each granted action to the scopes it applies to. Built fresh for every
/// request and passed explicitly to whatever executes on the caller's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub org_id: i64,
    pub permissions: BTreeMap<String, Vec<String>>,
}

impl ExecutionContext {
    pub fn new(org_id: i64) -> Self {
        Self {
            org_id,
            permissions: BTreeMap::new(),
        }
    }

    /// Grant `action` on `scope`. Granting twice is a no-op.
    pub fn grant(&mut self, action: &str, scope: impl Into<String>) {
        let scope = scope.into();
        let scopes = self.permissions.entry(action.to_string()).or_default();
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }

    /// Scopes granted for `action`, in grant order.
    pub fn scopes(&self, action: &str) -> &[String] {
        self.permissions
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `action` is granted on `scope`.
    ///
    /// A granted scope ending in `*` covers every scope sharing its prefix.
    /// Datasource scopes only ever match exactly.
    pub fn has_permission(&self, action: &str, scope: &str) -> bool {
        self.scopes(action).iter().any(|granted| {
            match granted
                .strip_suffix('*')
                .filter(|prefix| !prefix.starts_with(DATASOURCE_SCOPE_PREFIX))
            {
                Some(prefix) => scope.starts_with(prefix),
                None => granted == scope,
            }
        })
    }

    pub fn can_query_datasource(&self, uid: &str) -> bool {
        self.has_permission(ACTION_DATASOURCES_QUERY, &datasource_scope(uid))
    }

    /// Datasource uids the context may query.
    pub fn datasource_uids(&self) -> Vec<&str> {
        self.scopes(ACTION_DATASOURCES_QUERY)
            .iter()
            .filter_map(|scope| scope.strip_prefix(DATASOURCE_SCOPE_PREFIX))
            .collect()
    }

    /// No granted action can modify anything.
    pub fn is_read_only(&self) -> bool {
        self.permissions
            .keys()
            .all(|action| action.ends_with(":read") || action.ends_with(":query"))
    }
}

/// Derives the minimal [`ExecutionContext`] needed to serve a dashboard.
pub struct AnonymousContextBuilder;

impl AnonymousContextBuilder {
    /// Build the context for a stored dashboard.
    pub fn build(dashboard: &Dashboard) -> ExecutionContext {
        Self::from_queries(dashboard.org_id, &DashboardQueries::from_dashboard(dashboard))
    }

    /// Build the context from already extracted queries.
    ///
    /// Grants `datasources:query` and `datasources:read` on exactly the
    /// datasources the visible queries use (sorted by uid), `dashboards:read`
    /// on all dashboards and `annotations:read` on dashboard annotations only.
    pub fn from_queries(org_id: i64, queries: &DashboardQueries) -> ExecutionContext {
        let mut context = ExecutionContext::new(org_id);

        let uids: Vec<String> = queries
            .datasource_uids()
            .into_iter()
            .filter(|uid| {
                let literal = !uid.contains('*');
                if !literal {
                    warn!(org_id, datasource_uid = %uid, "Not granting wildcard datasource uid");
                }
                literal
            })
            .collect();
        for uid in &uids {
            context.grant(ACTION_DATASOURCES_QUERY, datasource_scope(uid));
            context.grant(ACTION_DATASOURCES_READ, datasource_scope(uid));
        }
        // keep both actions present even for a dashboard without queries
        context.permissions.entry(ACTION_DATASOURCES_QUERY.to_string()).or_default();
        context.permissions.entry(ACTION_DATASOURCES_READ.to_string()).or_default();

        context.grant(ACTION_DASHBOARDS_READ, SCOPE_DASHBOARDS_ALL);
        context.grant(ACTION_ANNOTATIONS_READ, SCOPE_ANNOTATIONS_TYPE_DASHBOARD);

        debug!(org_id, datasources = uids.len(), "Built anonymous execution context");
        context
    }
}
