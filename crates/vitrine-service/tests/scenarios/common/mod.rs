//! Shared fixtures for the service scenarios.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use vitrine_audit::{AuditEvent, AuditEventType, AuditLogger, MemoryStorage};
use vitrine_core::{AuditConfig, Dashboard, PublicDashboard, TimeSettings};
use vitrine_service::{
    EchoQueryDataService, IdGenerator, InMemoryAnnotationRepository, InMemoryDashboardStore,
    InMemoryPublicDashboardStore, PublicDashboardService, TokenLifecycleManager,
};

pub const ORG_ID: i64 = 1;
pub const DASHBOARD_UID: &str = "dash";
pub const ACCESS_TOKEN: &str = "e71950f3e7bb4a1d8a7a5b5e7a21c7c2";

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub dashboards: Arc<InMemoryDashboardStore>,
    pub public_dashboards: Arc<InMemoryPublicDashboardStore>,
    pub annotations: Arc<InMemoryAnnotationRepository>,
    pub query_data: Arc<EchoQueryDataService>,
    pub audit: Arc<MemoryStorage>,
    pub service: PublicDashboardService,
}

impl Harness {
    pub fn new(dashboards: Vec<Dashboard>) -> Self {
        Self::with_tokens(dashboards, TokenLifecycleManager::new())
    }

    pub fn with_tokens(dashboards: Vec<Dashboard>, tokens: TokenLifecycleManager) -> Self {
        let dashboard_store = Arc::new(InMemoryDashboardStore::with_dashboards(dashboards));
        let public_dashboards = Arc::new(InMemoryPublicDashboardStore::new());
        let annotations = Arc::new(InMemoryAnnotationRepository::default());
        let query_data = Arc::new(EchoQueryDataService::new());
        let audit = Arc::new(MemoryStorage::new());

        let service = PublicDashboardService::new(
            dashboard_store.clone(),
            public_dashboards.clone(),
            annotations.clone(),
            query_data.clone(),
        )
        .with_token_manager(tokens)
        .with_audit(Arc::new(AuditLogger::with_storage(
            AuditConfig::default(),
            audit.clone(),
        )));

        Self {
            dashboards: dashboard_store,
            public_dashboards,
            annotations,
            query_data,
            audit,
            service,
        }
    }

    /// Store an enabled public dashboard for [`DASHBOARD_UID`] directly.
    pub fn publish(&self, annotations_enabled: bool) -> PublicDashboard {
        let record = PublicDashboard {
            annotations_enabled,
            ..public_dashboard("pd1", DASHBOARD_UID, ACCESS_TOKEN, true)
        };
        self.public_dashboards.insert(record.clone()).unwrap();
        record
    }

    pub fn audit_types(&self) -> Vec<AuditEventType> {
        self.audit.events().iter().map(|e: &AuditEvent| e.event_type).collect()
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn public_dashboard(
    uid: &str,
    dashboard_uid: &str,
    access_token: &str,
    is_enabled: bool,
) -> PublicDashboard {
    PublicDashboard {
        uid: uid.to_string(),
        dashboard_uid: dashboard_uid.to_string(),
        org_id: ORG_ID,
        access_token: access_token.to_string(),
        is_enabled,
        annotations_enabled: false,
        time_settings: TimeSettings::default(),
        created_by: 1,
        created_at: Utc::now(),
        updated_by: None,
        updated_at: None,
    }
}

pub fn dashboard_with(uid: &str, data: Value) -> Dashboard {
    Dashboard::new(uid, ORG_ID, data).with_id(1)
}

/// Two panels over two datasources, one hidden query, a collapsed row.
pub fn dashboard() -> Dashboard {
    dashboard_with(
        DASHBOARD_UID,
        json!({
            "title": "Service overview",
            "time": {"from": "now-90d", "to": "now"},
            "panels": [
                {
                    "id": 1,
                    "datasource": {"type": "prometheus", "uid": "prom"},
                    "targets": [
                        {"refId": "A", "expr": "up", "exemplar": true},
                        {"refId": "B", "expr": "hidden", "hide": true},
                        {"refId": "C", "datasource": {"type": "mysql", "uid": "sql"}, "rawSql": "select 1"}
                    ]
                },
                {
                    "id": 2,
                    "datasource": {"type": "prometheus", "uid": "prom"},
                    "targets": [{"refId": "A", "hide": true}]
                },
                {
                    "id": 3,
                    "type": "row",
                    "panels": [
                        {"id": 4, "datasource": "legacy", "targets": [{"refId": "A"}]}
                    ]
                }
            ]
        }),
    )
}

/// Hands out a fixed sequence of candidates.
pub struct Scripted(std::sync::Mutex<Vec<String>>);

impl Scripted {
    pub fn new(candidates: &[&str]) -> Arc<Self> {
        let mut candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
        candidates.reverse();
        Arc::new(Self(std::sync::Mutex::new(candidates)))
    }
}

impl IdGenerator for Scripted {
    fn new_random_id(&self) -> String {
        self.0.lock().unwrap().pop().unwrap_or_default()
    }
}
