//! Anonymous annotation reads.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use vitrine_audit::AuditEventType;
use vitrine_core::{AnnotationItem, AnnotationQuery, AnnotationsQuery, Dashboard};
use vitrine_policy::ExecutionContext;
use vitrine_service::{
    AnnotationRepository, EchoQueryDataService, InMemoryDashboardStore,
    InMemoryPublicDashboardStore, PublicDashboardError, PublicDashboardService,
};

use super::common::*;

fn builtin(name: &str, color: &str, target: Value) -> Value {
    json!({
        "datasource": {"type": "grafana", "uid": "grafana"},
        "enable": true,
        "name": name,
        "iconColor": color,
        "target": target,
        "type": "dashboard"
    })
}

fn annotated_dashboard() -> Dashboard {
    dashboard_with(
        DASHBOARD_UID,
        json!({
            "panels": [],
            "annotations": {"list": [
                builtin("Annotations & Alerts", "blue", json!({"limit": 100, "matchAny": false, "type": "dashboard"})),
                builtin("Deploys", "red", json!({"limit": 100, "matchAny": false, "tags": ["deploy"], "type": "tags"})),
                {"datasource": {"type": "prometheus", "uid": "prom"}, "enable": true, "name": "alerts", "expr": "ALERTS"}
            ]}
        }),
    )
}

fn item(id: i64, dashboard_uid: Option<&str>, tags: &[&str], time: i64, time_end: i64) -> AnnotationItem {
    AnnotationItem {
        id,
        dashboard_id: if dashboard_uid.is_some() { 1 } else { 0 },
        dashboard_uid: dashboard_uid.map(str::to_string),
        panel_id: 3,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        time,
        time_end,
        text: format!("event {id}"),
    }
}

fn seed(h: &Harness) {
    for annotation in [
        // on this dashboard and tagged
        item(1, Some(DASHBOARD_UID), &["deploy"], 1_000, 1_000),
        // on this dashboard, untagged region
        item(2, Some(DASHBOARD_UID), &[], 2_000, 3_000),
        // organization-wide deploy
        item(3, None, &["deploy"], 4_000, 0),
        // another tag elsewhere
        item(4, None, &["incident"], 5_000, 0),
    ] {
        h.annotations.insert(annotation).unwrap();
    }
}

#[tokio::test]
async fn test_tag_definitions_win_over_dashboard_definition() {
    let h = Harness::new(vec![annotated_dashboard()]);
    h.publish(true);
    seed(&h);

    let events = h
        .service
        .find_annotations(&AnnotationsQuery::default(), ACCESS_TOKEN)
        .await
        .unwrap();

    let summary: Vec<(i64, i64, &str, bool)> = events
        .iter()
        .map(|e| (e.id, e.panel_id, e.color.as_str(), e.is_region))
        .collect();
    assert_eq!(
        summary,
        vec![(1, 0, "red", false), (2, 3, "blue", true), (3, 0, "red", false)]
    );
    assert_eq!(events[0].source.name.as_deref(), Some("Deploys"));
    assert_eq!(events[1].text, "event 2");
}

#[tokio::test]
async fn test_time_window_is_forwarded() {
    let h = Harness::new(vec![annotated_dashboard()]);
    h.publish(true);
    seed(&h);

    let events = h
        .service
        .find_annotations(&AnnotationsQuery { from: 1_500, to: 4_500 }, ACCESS_TOKEN)
        .await
        .unwrap();

    assert_eq!(events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 3]);
}

#[tokio::test]
async fn test_disabled_annotations_or_missing_section_yield_nothing() {
    let disabled = Harness::new(vec![annotated_dashboard()]);
    disabled.publish(false);
    seed(&disabled);

    let no_section = Harness::new(vec![dashboard()]);
    no_section.publish(true);
    seed(&no_section);

    for h in [&disabled, &no_section] {
        let events = h
            .service
            .find_annotations(&AnnotationsQuery::default(), ACCESS_TOKEN)
            .await
            .unwrap();
        assert!(events.is_empty());
    }
    assert!(disabled.audit.events().is_empty());
}

#[tokio::test]
async fn test_disabled_record_is_not_found() {
    let h = Harness::new(vec![annotated_dashboard()]);
    h.public_dashboards
        .insert(vitrine_core::PublicDashboard {
            annotations_enabled: true,
            ..public_dashboard("pd1", DASHBOARD_UID, ACCESS_TOKEN, false)
        })
        .unwrap();

    let err = h
        .service
        .find_annotations(&AnnotationsQuery::default(), ACCESS_TOKEN)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_served_annotations_are_audited() {
    let h = Harness::new(vec![annotated_dashboard()]);
    h.publish(true);
    seed(&h);

    h.service
        .find_annotations(&AnnotationsQuery::default(), ACCESS_TOKEN)
        .await
        .unwrap();

    assert_eq!(h.audit_types(), vec![AuditEventType::AnnotationsServed]);
    assert_eq!(h.audit.events()[0].annotation_count, Some(3));
}

#[tokio::test]
async fn test_repository_failure_returns_no_items() {
    struct Failing;

    #[async_trait]
    impl AnnotationRepository for Failing {
        async fn find(
            &self,
            _query: &AnnotationQuery,
            _context: &ExecutionContext,
        ) -> anyhow::Result<Vec<AnnotationItem>> {
            Err(anyhow::anyhow!("annotation store unavailable"))
        }
    }

    let public_dashboards = Arc::new(InMemoryPublicDashboardStore::new());
    public_dashboards
        .insert(vitrine_core::PublicDashboard {
            annotations_enabled: true,
            ..public_dashboard("pd1", DASHBOARD_UID, ACCESS_TOKEN, true)
        })
        .unwrap();
    let service = PublicDashboardService::new(
        Arc::new(InMemoryDashboardStore::with_dashboards([annotated_dashboard()])),
        public_dashboards,
        Arc::new(Failing),
        Arc::new(EchoQueryDataService::new()),
    );

    let err = service
        .find_annotations(&AnnotationsQuery::default(), ACCESS_TOKEN)
        .await
        .unwrap_err();
    assert!(matches!(err, PublicDashboardError::Upstream { .. }));
}
