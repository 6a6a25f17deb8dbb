//! Collaborator interfaces.
//!
//! Persistence, annotation storage and query execution live outside Vitrine.
//! The service reaches them only through these traits; failures are reported
//! as `anyhow::Error` and wrapped by the service.

use async_trait::async_trait;
use vitrine_core::{
    AnnotationItem, AnnotationQuery, Dashboard, MetricRequest, PublicDashboard, QueryDataResponse,
};
use vitrine_policy::ExecutionContext;

/// Read access to stored dashboards.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Find a dashboard by uid within an organization.
    async fn find_dashboard(&self, org_id: i64, uid: &str) -> anyhow::Result<Option<Dashboard>>;

    /// Insert or replace a dashboard.
    async fn save_dashboard(&self, dashboard: Dashboard) -> anyhow::Result<Dashboard>;
}

/// Persistence of public dashboard records.
#[async_trait]
pub trait PublicDashboardStore: Send + Sync {
    async fn find(&self, uid: &str) -> anyhow::Result<Option<PublicDashboard>>;

    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Option<PublicDashboard>>;

    async fn find_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> anyhow::Result<Option<PublicDashboard>>;

    /// Every public dashboard of an organization, in no particular order.
    async fn find_all(&self, org_id: i64) -> anyhow::Result<Vec<PublicDashboard>>;

    /// Insert a new record.
    async fn save(&self, public_dashboard: &PublicDashboard) -> anyhow::Result<()>;

    /// Replace the mutable fields of an existing record, matched by uid.
    async fn update(&self, public_dashboard: &PublicDashboard) -> anyhow::Result<()>;

    async fn exists_enabled_by_access_token(&self, access_token: &str) -> anyhow::Result<bool>;

    async fn exists_enabled_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> anyhow::Result<bool>;

    async fn get_org_id_by_access_token(&self, access_token: &str) -> anyhow::Result<Option<i64>>;
}

/// Native annotation storage.
#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    /// Annotations matching `query`, read on behalf of `context`.
    async fn find(
        &self,
        query: &AnnotationQuery,
        context: &ExecutionContext,
    ) -> anyhow::Result<Vec<AnnotationItem>>;
}

/// The time-series query backend.
#[async_trait]
pub trait QueryDataService: Send + Sync {
    /// Execute every query of `request` on behalf of `context`.
    async fn execute(
        &self,
        request: &MetricRequest,
        context: &ExecutionContext,
    ) -> anyhow::Result<QueryDataResponse>;
}
