//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with helper methods for the
//! configuration and anonymous read events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use vitrine_core::{AuditConfig, PublicDashboard};

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventType};
use crate::storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, NullStorage};

/// The main audit logger.
pub struct AuditLogger {
    config: AuditConfig,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    ///
    /// `file` and `stdout` pick the storage: both gives file plus console,
    /// neither keeps events in tracing only.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = if !config.enabled {
            Arc::new(NullStorage::new())
        } else {
            match (&config.file, config.stdout) {
                (Some(path), true) => Arc::new(DualStorage::new(path)?),
                (Some(path), false) => Arc::new(FileStorage::new(path)?),
                (None, true) => Arc::new(ConsoleStorage::new()),
                (None, false) => Arc::new(NullStorage::new()),
            }
        };

        Ok(Self { config, storage })
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(config: AuditConfig, storage: Arc<dyn AuditStorage>) -> Self {
        Self { config, storage }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            storage: Arc::new(NullStorage::new()),
        }
    }

    /// Create a console-only logger (useful for development).
    pub fn console_only() -> Self {
        Self {
            config: AuditConfig {
                enabled: true,
                stdout: true,
                file: None,
            },
            storage: Arc::new(ConsoleStorage::new()),
        }
    }

    /// Check if logging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.config.enabled {
            return Ok(());
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            org_id = event.org_id,
            dashboard_uid = %event.dashboard_uid,
            "Audit event"
        );

        self.storage.store(event).await
    }

    /// Log the creation of a public dashboard.
    pub async fn log_created(
        &self,
        public_dashboard: &PublicDashboard,
        user_id: i64,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(
            AuditEventType::PublicDashboardCreated,
            public_dashboard.org_id,
            &public_dashboard.dashboard_uid,
        )
        .public_dashboard_uid(&public_dashboard.uid)
        .user_id(user_id)
        .after(public_dashboard)
        .build();

        self.log(event).await
    }

    /// Log an update, with the diff between both versions.
    pub async fn log_updated(
        &self,
        before: &PublicDashboard,
        after: &PublicDashboard,
        user_id: i64,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(
            AuditEventType::PublicDashboardUpdated,
            after.org_id,
            &after.dashboard_uid,
        )
        .public_dashboard_uid(&after.uid)
        .user_id(user_id)
        .before(before)
        .after(after)
        .compute_diff()
        .build();

        self.log(event).await
    }

    /// Log a switch of anonymous access, in the direction `is_enabled` says.
    pub async fn log_enabled_changed(
        &self,
        public_dashboard: &PublicDashboard,
        user_id: i64,
    ) -> Result<(), AuditError> {
        let event_type = if public_dashboard.is_enabled {
            AuditEventType::PublicDashboardEnabled
        } else {
            AuditEventType::PublicDashboardDisabled
        };
        let event = AuditEvent::builder(
            event_type,
            public_dashboard.org_id,
            &public_dashboard.dashboard_uid,
        )
        .public_dashboard_uid(&public_dashboard.uid)
        .user_id(user_id)
        .build();

        self.log(event).await
    }

    /// Log a panel query answered for an anonymous caller.
    pub async fn log_query_served(
        &self,
        public_dashboard: &PublicDashboard,
        panel_id: i64,
        query_count: u64,
        duration_ms: u64,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(
            AuditEventType::QueryServed,
            public_dashboard.org_id,
            &public_dashboard.dashboard_uid,
        )
        .public_dashboard_uid(&public_dashboard.uid)
        .panel_id(panel_id)
        .query_count(query_count)
        .duration_ms(duration_ms)
        .build();

        self.log(event).await
    }

    /// Log a failed panel query.
    pub async fn log_query_failed(
        &self,
        public_dashboard: &PublicDashboard,
        panel_id: i64,
        error: &str,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(
            AuditEventType::QueryFailed,
            public_dashboard.org_id,
            &public_dashboard.dashboard_uid,
        )
        .public_dashboard_uid(&public_dashboard.uid)
        .panel_id(panel_id)
        .error(error)
        .build();

        self.log(event).await
    }

    /// Log annotations returned to an anonymous caller.
    pub async fn log_annotations_served(
        &self,
        public_dashboard: &PublicDashboard,
        annotation_count: u64,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::builder(
            AuditEventType::AnnotationsServed,
            public_dashboard.org_id,
            &public_dashboard.dashboard_uid,
        )
        .public_dashboard_uid(&public_dashboard.uid)
        .annotation_count(annotation_count)
        .build();

        self.log(event).await
    }

    /// Query audit events with filters.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }

    /// Get an audit event by ID.
    pub async fn get(&self, event_id: uuid::Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.storage.get(event_id).await
    }

    /// Recent configuration and read events of one dashboard.
    pub async fn recent_for_dashboard(
        &self,
        org_id: i64,
        dashboard_uid: &str,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(AuditFilter {
            org_id: Some(org_id),
            dashboard_uid: Some(dashboard_uid.to_string()),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by organization.
    pub org_id: Option<i64>,
    /// Filter by dashboard uid.
    pub dashboard_uid: Option<String>,
    /// Filter by event type.
    pub event_type: Option<AuditEventType>,
    /// Filter by start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Filter by end time.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl AuditFilter {
    /// Whether an event passes every set criterion.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.org_id.is_none_or(|org_id| event.org_id == org_id)
            && self
                .dashboard_uid
                .as_ref()
                .is_none_or(|uid| &event.dashboard_uid == uid)
            && self.event_type.is_none_or(|t| event.event_type == t)
            && self.start_time.is_none_or(|start| event.occurred_at >= start)
            && self.end_time.is_none_or(|end| event.occurred_at <= end)
    }

    /// Filter, then apply offset and limit.
    pub fn apply(&self, events: impl IntoIterator<Item = AuditEvent>) -> Vec<AuditEvent> {
        events
            .into_iter()
            .filter(|e| self.matches(e))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
