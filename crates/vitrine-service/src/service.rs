//! The public dashboard service.
//!
//! Owners save and list public dashboard configurations; anonymous callers
//! holding an access token read panel data and annotations. Every anonymous
//! read resolves the record and its dashboard afresh, rebuilds the execution
//! context from the dashboard, and never reuses anything across requests.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use vitrine_audit::{AuditError, AuditLogger};
use vitrine_core::{
    AnnotationEvent, AnnotationsQuery, Dashboard, MetricRequest, PublicDashboard,
    PublicDashboardListItem, PublicDashboardQuery, QueryDataResponse, SavePublicDashboardCommand,
    VitrineConfig, config::QueryConfig,
};
use vitrine_policy::{
    AnonymousContextBuilder, ValidationError, authorize_queries, validate_dashboard_publishable,
    validate_query_request, validate_uid,
};
use vitrine_query::{
    DashboardQueries, SafeRangeCalculator, group_queries_by_datasource, parse_time_range,
    resolve_time_settings, sanitize_metadata_from_query_data,
};

use crate::annotations::AnnotationResolver;
use crate::error::{PublicDashboardError, Result};
use crate::store::{AnnotationRepository, DashboardStore, PublicDashboardStore, QueryDataService};
use crate::tokens::TokenLifecycleManager;

/// Whether saving `new` switched anonymous access on or off.
///
/// A new record counts as a change when it is created enabled.
pub fn is_enabled_changed(existing: Option<&PublicDashboard>, new: &PublicDashboard) -> bool {
    match existing {
        Some(existing) => existing.is_enabled != new.is_enabled,
        None => new.is_enabled,
    }
}

pub struct PublicDashboardService {
    dashboards: Arc<dyn DashboardStore>,
    public_dashboards: Arc<dyn PublicDashboardStore>,
    annotations: AnnotationResolver,
    query_data: Arc<dyn QueryDataService>,
    tokens: TokenLifecycleManager,
    safe_range: SafeRangeCalculator,
    query_config: QueryConfig,
    audit: Arc<AuditLogger>,
}

impl PublicDashboardService {
    pub fn new(
        dashboards: Arc<dyn DashboardStore>,
        public_dashboards: Arc<dyn PublicDashboardStore>,
        annotations: Arc<dyn AnnotationRepository>,
        query_data: Arc<dyn QueryDataService>,
    ) -> Self {
        let query_config = QueryConfig::default();
        Self {
            dashboards,
            public_dashboards,
            annotations: AnnotationResolver::new(annotations),
            query_data,
            tokens: TokenLifecycleManager::new(),
            safe_range: SafeRangeCalculator::new(query_config.safe_resolution),
            query_config,
            audit: Arc::new(AuditLogger::disabled()),
        }
    }

    /// Apply the query and token sections of `config`.
    pub fn with_config(mut self, config: &VitrineConfig) -> Self {
        self.tokens = TokenLifecycleManager::from_config(&config.tokens);
        self.safe_range = SafeRangeCalculator::new(config.query.safe_resolution);
        self.query_config = config.query.clone();
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_token_manager(mut self, tokens: TokenLifecycleManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn safe_range(&self) -> &SafeRangeCalculator {
        &self.safe_range
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// Resolve an access token to its enabled record and backing dashboard.
    ///
    /// Empty token, unknown token, disabled record and deleted dashboard all
    /// give [`PublicDashboardError::NotFound`].
    pub async fn find_public_dashboard_and_dashboard_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<(PublicDashboard, Dashboard)> {
        if access_token.is_empty() {
            return Err(PublicDashboardError::NotFound);
        }

        let public_dashboard = self
            .public_dashboards
            .find_by_access_token(access_token)
            .await
            .map_err(|source| PublicDashboardError::upstream("finding public dashboard", source))?
            .ok_or(PublicDashboardError::NotFound)?;

        if !public_dashboard.is_enabled {
            debug!(uid = %public_dashboard.uid, "Public dashboard is disabled");
            return Err(PublicDashboardError::NotFound);
        }

        let dashboard = self
            .find_dashboard(public_dashboard.org_id, &public_dashboard.dashboard_uid)
            .await?;

        Ok((public_dashboard, dashboard))
    }

    pub async fn find_dashboard(&self, org_id: i64, dashboard_uid: &str) -> Result<Dashboard> {
        self.dashboards
            .find_dashboard(org_id, dashboard_uid)
            .await
            .map_err(|source| PublicDashboardError::upstream("finding dashboard", source))?
            .ok_or(PublicDashboardError::NotFound)
    }

    /// The public dashboard of a dashboard, enabled or not.
    pub async fn find_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> Result<PublicDashboard> {
        self.public_dashboards
            .find_by_dashboard_uid(org_id, dashboard_uid)
            .await
            .map_err(|source| PublicDashboardError::upstream("finding public dashboard", source))?
            .ok_or(PublicDashboardError::NotFound)
    }

    /// Every public dashboard of an organization with its dashboard title.
    ///
    /// Enabled ones come first, then those whose dashboard still exists, then
    /// by title.
    pub async fn list(&self, org_id: i64) -> Result<Vec<PublicDashboardListItem>> {
        let records = self
            .public_dashboards
            .find_all(org_id)
            .await
            .map_err(|source| PublicDashboardError::upstream("listing public dashboards", source))?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let title = self
                .dashboards
                .find_dashboard(record.org_id, &record.dashboard_uid)
                .await
                .map_err(|source| PublicDashboardError::upstream("finding dashboard", source))?
                .map(|dashboard| dashboard.title);

            items.push(PublicDashboardListItem {
                uid: record.uid,
                access_token: record.access_token,
                dashboard_uid: record.dashboard_uid,
                title,
                is_enabled: record.is_enabled,
            });
        }

        items.sort_by(|a, b| {
            b.is_enabled
                .cmp(&a.is_enabled)
                .then_with(|| match (&a.title, &b.title) {
                    (Some(a), Some(b)) => a.cmp(b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
                .then_with(|| a.uid.cmp(&b.uid))
        });
        Ok(items)
    }

    pub async fn exists_enabled_by_access_token(&self, access_token: &str) -> Result<bool> {
        if access_token.is_empty() {
            return Ok(false);
        }
        self.public_dashboards
            .exists_enabled_by_access_token(access_token)
            .await
            .map_err(|source| PublicDashboardError::upstream("checking access token", source))
    }

    pub async fn exists_enabled_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> Result<bool> {
        self.public_dashboards
            .exists_enabled_by_dashboard_uid(org_id, dashboard_uid)
            .await
            .map_err(|source| PublicDashboardError::upstream("checking dashboard", source))
    }

    pub async fn get_org_id_by_access_token(&self, access_token: &str) -> Result<i64> {
        if access_token.is_empty() {
            return Err(PublicDashboardError::NotFound);
        }
        self.public_dashboards
            .get_org_id_by_access_token(access_token)
            .await
            .map_err(|source| PublicDashboardError::upstream("finding organization", source))?
            .ok_or(PublicDashboardError::NotFound)
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Create or update the public dashboard of `cmd.dashboard_uid`.
    ///
    /// The existing record is looked up by `cmd.uid` when given, otherwise by
    /// dashboard. A dashboard has at most one record, so a supplied uid that is
    /// unknown while the dashboard already has a record is rejected. Returns
    /// the record as persisted.
    pub async fn save(&self, cmd: SavePublicDashboardCommand) -> Result<PublicDashboard> {
        let by_dashboard = self
            .public_dashboards
            .find_by_dashboard_uid(cmd.org_id, &cmd.dashboard_uid)
            .await
            .map_err(|source| PublicDashboardError::upstream("finding public dashboard", source))?;

        let existing = match &cmd.uid {
            Some(uid) => {
                validate_uid(uid)?;
                let by_uid = self.public_dashboards.find(uid).await.map_err(|source| {
                    PublicDashboardError::upstream("finding public dashboard", source)
                })?;
                if by_uid.is_none() && by_dashboard.is_some() {
                    return Err(ValidationError::dashboard_mismatch(uid, &cmd.dashboard_uid).into());
                }
                by_uid
            }
            None => by_dashboard,
        };

        match existing {
            Some(existing) => {
                if existing.dashboard_uid != cmd.dashboard_uid || existing.org_id != cmd.org_id {
                    return Err(
                        ValidationError::dashboard_mismatch(&existing.uid, &cmd.dashboard_uid).into(),
                    );
                }
                self.update(existing, cmd).await
            }
            None => self.create(cmd).await,
        }
    }

    async fn create(&self, cmd: SavePublicDashboardCommand) -> Result<PublicDashboard> {
        let dashboard = self.find_dashboard(cmd.org_id, &cmd.dashboard_uid).await?;
        validate_dashboard_publishable(&dashboard)?;

        let store = self.public_dashboards.as_ref();
        let uid = match cmd.uid {
            Some(uid) => uid,
            None => self.tokens.generate_uid(store).await?,
        };
        let access_token = self.tokens.generate_access_token(store).await?;

        let record = PublicDashboard {
            uid,
            dashboard_uid: cmd.dashboard_uid,
            org_id: cmd.org_id,
            access_token,
            is_enabled: cmd.is_enabled,
            annotations_enabled: cmd.annotations_enabled,
            time_settings: cmd.time_settings.unwrap_or_default(),
            created_by: cmd.user_id,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        };

        store
            .save(&record)
            .await
            .map_err(|source| PublicDashboardError::upstream("saving public dashboard", source))?;
        let saved = self.reload(&record.uid).await?;

        debug!(uid = %saved.uid, dashboard_uid = %saved.dashboard_uid, "Created public dashboard");
        record_audit(self.audit.log_created(&saved, cmd.user_id).await);
        self.on_saved(None, &saved, cmd.user_id).await;
        Ok(saved)
    }

    async fn update(
        &self,
        existing: PublicDashboard,
        cmd: SavePublicDashboardCommand,
    ) -> Result<PublicDashboard> {
        let record = PublicDashboard {
            is_enabled: cmd.is_enabled,
            annotations_enabled: cmd.annotations_enabled,
            time_settings: cmd.time_settings.unwrap_or_default(),
            updated_by: Some(cmd.user_id),
            updated_at: Some(Utc::now()),
            ..existing.clone()
        };

        self.public_dashboards
            .update(&record)
            .await
            .map_err(|source| PublicDashboardError::upstream("updating public dashboard", source))?;
        let saved = self.reload(&record.uid).await?;

        debug!(uid = %saved.uid, dashboard_uid = %saved.dashboard_uid, "Updated public dashboard");
        record_audit(self.audit.log_updated(&existing, &saved, cmd.user_id).await);
        self.on_saved(Some(&existing), &saved, cmd.user_id).await;
        Ok(saved)
    }

    async fn reload(&self, uid: &str) -> Result<PublicDashboard> {
        self.public_dashboards
            .find(uid)
            .await
            .map_err(|source| PublicDashboardError::upstream("reading saved public dashboard", source))?
            .ok_or(PublicDashboardError::NotFound)
    }

    async fn on_saved(&self, existing: Option<&PublicDashboard>, saved: &PublicDashboard, user_id: i64) {
        if !is_enabled_changed(existing, saved) {
            return;
        }
        info!(
            uid = %saved.uid,
            org_id = saved.org_id,
            dashboard_uid = %saved.dashboard_uid,
            is_enabled = saved.is_enabled,
            user_id,
            "Public dashboard access changed"
        );
        record_audit(self.audit.log_enabled_changed(saved, user_id).await);
    }

    // =========================================================================
    // ANONYMOUS READS
    // =========================================================================

    /// The query set for one panel, with safe resolution applied.
    pub fn get_metric_request(
        &self,
        dashboard: &Dashboard,
        public_dashboard: &PublicDashboard,
        panel_id: i64,
        query: &PublicDashboardQuery,
    ) -> Result<MetricRequest> {
        validate_query_request(query)?;

        let queries = DashboardQueries::from_dashboard(dashboard);
        let panel = queries
            .panel(panel_id)
            .ok_or_else(|| ValidationError::panel_not_found(panel_id))?;

        let settings =
            resolve_time_settings(&public_dashboard.time_settings, dashboard, &self.query_config);
        let from = settings.from.unwrap_or_default();
        let to = settings.to.unwrap_or_default();
        let range =
            parse_time_range(&from, &to, Utc::now()).map_err(ValidationError::invalid_time_range)?;

        let safe = self
            .safe_range
            .calculate(query.interval_ms, query.max_data_points, &range);

        let queries = panel
            .iter()
            .cloned()
            .map(|mut descriptor| {
                descriptor.set_interval_ms(safe.interval_ms);
                descriptor.set_max_data_points(safe.max_data_points);
                descriptor
            })
            .collect();

        Ok(MetricRequest {
            from,
            to,
            range,
            queries,
        })
    }

    /// Execute one panel's queries for an anonymous caller.
    ///
    /// Queries are dispatched once per datasource. The merged response has its
    /// frame diagnostics removed.
    pub async fn get_metric_data_for_panel(
        &self,
        dashboard: &Dashboard,
        public_dashboard: &PublicDashboard,
        panel_id: i64,
        query: &PublicDashboardQuery,
    ) -> Result<QueryDataResponse> {
        let started = Instant::now();
        match self
            .execute_panel(dashboard, public_dashboard, panel_id, query)
            .await
        {
            Ok((response, query_count)) => {
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                record_audit(
                    self.audit
                        .log_query_served(public_dashboard, panel_id, query_count, duration_ms)
                        .await,
                );
                Ok(response)
            }
            Err(err) => {
                record_audit(
                    self.audit
                        .log_query_failed(public_dashboard, panel_id, &err.to_string())
                        .await,
                );
                Err(err)
            }
        }
    }

    async fn execute_panel(
        &self,
        dashboard: &Dashboard,
        public_dashboard: &PublicDashboard,
        panel_id: i64,
        query: &PublicDashboardQuery,
    ) -> Result<(QueryDataResponse, u64)> {
        let request = self.get_metric_request(dashboard, public_dashboard, panel_id, query)?;
        if request.queries.is_empty() {
            debug!(dashboard_uid = %dashboard.uid, panel_id, "Panel has no visible queries");
            return Ok((QueryDataResponse::default(), 0));
        }

        let context = AnonymousContextBuilder::build(dashboard);
        authorize_queries(&context, &request.queries)?;

        let mut response = QueryDataResponse::default();
        for (datasource_uid, queries) in group_queries_by_datasource(&request.queries) {
            debug!(
                dashboard_uid = %dashboard.uid,
                panel_id,
                datasource_uid = datasource_uid.as_deref().unwrap_or_default(),
                queries = queries.len(),
                "Dispatching queries"
            );
            let group = MetricRequest {
                from: request.from.clone(),
                to: request.to.clone(),
                range: request.range,
                queries,
            };
            let partial = self
                .query_data
                .execute(&group, &context)
                .await
                .map_err(|source| PublicDashboardError::upstream("executing panel queries", source))?;
            response.merge(partial);
        }

        sanitize_metadata_from_query_data(&mut response);
        Ok((response, request.queries.len() as u64))
    }

    /// Resolve `access_token` and execute one panel's queries.
    pub async fn get_query_data_response(
        &self,
        access_token: &str,
        panel_id: i64,
        query: &PublicDashboardQuery,
    ) -> Result<QueryDataResponse> {
        let (public_dashboard, dashboard) = self
            .find_public_dashboard_and_dashboard_by_access_token(access_token)
            .await?;
        self.get_metric_data_for_panel(&dashboard, &public_dashboard, panel_id, query)
            .await
    }

    /// Annotation events of the dashboard behind `access_token`.
    ///
    /// Empty when annotations are disabled on the record.
    pub async fn find_annotations(
        &self,
        query: &AnnotationsQuery,
        access_token: &str,
    ) -> Result<Vec<AnnotationEvent>> {
        let (public_dashboard, dashboard) = self
            .find_public_dashboard_and_dashboard_by_access_token(access_token)
            .await?;

        if !public_dashboard.annotations_enabled {
            debug!(uid = %public_dashboard.uid, "Annotations are disabled");
            return Ok(Vec::new());
        }

        let context = AnonymousContextBuilder::build(&dashboard);
        let events = self.annotations.resolve(&dashboard, query, &context).await?;

        record_audit(
            self.audit
                .log_annotations_served(&public_dashboard, events.len() as u64)
                .await,
        );
        Ok(events)
    }
}

fn record_audit(result: std::result::Result<(), AuditError>) {
    if let Err(err) = result {
        warn!(error = %err, "Failed to record audit event");
    }
}
