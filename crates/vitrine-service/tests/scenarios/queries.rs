//! Anonymous panel queries.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use vitrine_audit::AuditEventType;
use vitrine_core::{
    MetricRequest, PublicDashboard, PublicDashboardQuery, QueryDataResponse, TimeSettings,
};
use vitrine_policy::{ExecutionContext, ValidationErrorKind};
use vitrine_service::{
    InMemoryAnnotationRepository, InMemoryDashboardStore, InMemoryPublicDashboardStore,
    PublicDashboardError, PublicDashboardService, QueryDataService,
};

use super::common::*;

fn request(interval_ms: i64, max_data_points: i64) -> PublicDashboardQuery {
    PublicDashboardQuery {
        interval_ms,
        max_data_points,
    }
}

fn validation_kind(err: PublicDashboardError) -> ValidationErrorKind {
    err.as_validation()
        .map(|v| v.kind)
        .unwrap_or_else(|| panic!("expected a validation error, got {err}"))
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn test_visible_queries_are_dispatched_per_datasource() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    let response = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(100, 300))
        .await
        .unwrap();

    assert_eq!(response.responses.keys().collect::<Vec<_>>(), vec!["A", "C"]);

    let requests = h.query_data.requests();
    assert_eq!(requests.len(), 2);
    let ref_ids: Vec<Vec<&str>> = requests
        .iter()
        .map(|r| r.queries.iter().filter_map(|q| q.ref_id()).collect())
        .collect();
    assert_eq!(ref_ids, vec![vec!["A"], vec!["C"]]);

    let first = &requests[0].queries[0];
    assert_eq!(first.get("datasource"), Some(&json!({"type": "prometheus", "uid": "prom"})));
    assert!(!first.contains("exemplar"));
}

#[tokio::test]
async fn test_long_range_is_clamped_to_the_point_ceiling() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    h.service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(100, 300))
        .await
        .unwrap();

    for sent in h.query_data.requests() {
        assert_eq!(sent.from, "now-90d");
        for query in &sent.queries {
            assert_eq!(query.interval_ms(), Some(600_000));
            assert_eq!(query.max_data_points(), Some(11_000));
        }
    }
}

#[tokio::test]
async fn test_public_time_settings_override_the_dashboard() {
    let h = Harness::new(vec![dashboard()]);
    let record = PublicDashboard {
        time_settings: TimeSettings::new("now-6h", "now"),
        ..h.publish(false)
    };
    h.public_dashboards.insert(record).unwrap();

    h.service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(1_000, 0))
        .await
        .unwrap();
    h.service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(60_000, 500))
        .await
        .unwrap();

    let requests = h.query_data.requests();
    let fine = &requests[0].queries[0];
    assert_eq!(requests[0].from, "now-6h");
    assert_eq!(fine.interval_ms(), Some(2_000));
    assert_eq!(fine.max_data_points(), Some(11_000));

    // coarser than the safe interval: kept
    let coarse = &requests[2].queries[0];
    assert_eq!(coarse.interval_ms(), Some(60_000));
    assert_eq!(coarse.max_data_points(), Some(500));
}

#[tokio::test]
async fn test_collapsed_row_panel_with_legacy_datasource() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    let response = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 4, &request(0, 0))
        .await
        .unwrap();

    assert!(response.responses.contains_key("A"));
    let sent = &h.query_data.requests()[0].queries[0];
    assert_eq!(sent.get("datasource"), Some(&json!({"type": "public-ds", "uid": "legacy"})));
}

#[tokio::test]
async fn test_all_hidden_panel_returns_empty_without_backend_call() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    let response = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 2, &request(0, 0))
        .await
        .unwrap();

    assert!(response.is_empty());
    assert!(h.query_data.requests().is_empty());
}

// =============================================================================
// SANITIZATION AND AUDIT
// =============================================================================

#[tokio::test]
async fn test_frame_diagnostics_are_removed() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    let response = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(0, 0))
        .await
        .unwrap();

    for data in response.responses.values() {
        for frame in &data.frames {
            let meta = frame.meta.as_ref().unwrap();
            assert_eq!(meta.executed_query_string, None);
            assert_eq!(meta.custom, None);
            assert_eq!(frame.fields.len(), 2);
        }
    }
}

#[tokio::test]
async fn test_reads_are_audited() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    h.service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(0, 0))
        .await
        .unwrap();
    h.service
        .get_query_data_response(ACCESS_TOKEN, 99, &request(0, 0))
        .await
        .unwrap_err();

    assert_eq!(
        h.audit_types(),
        vec![AuditEventType::QueryServed, AuditEventType::QueryFailed]
    );
    let served = &h.audit.events()[0];
    assert_eq!(served.panel_id, Some(1));
    assert_eq!(served.query_count, Some(2));
}

// =============================================================================
// REJECTIONS
// =============================================================================

#[tokio::test]
async fn test_unknown_or_disabled_record_is_not_found() {
    let h = Harness::new(vec![dashboard()]);
    h.public_dashboards
        .insert(public_dashboard("pd1", DASHBOARD_UID, ACCESS_TOKEN, false))
        .unwrap();

    for token in [ACCESS_TOKEN, "", "00000000000000000000000000000000"] {
        let err = h
            .service
            .get_query_data_response(token, 1, &request(0, 0))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{token}: {err}");
    }
    assert!(h.query_data.requests().is_empty());
}

#[tokio::test]
async fn test_deleted_dashboard_is_not_found() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);
    h.dashboards.remove(ORG_ID, DASHBOARD_UID).unwrap();

    let err = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(0, 0))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unknown_panel_and_negative_hints_are_rejected() {
    let h = Harness::new(vec![dashboard()]);
    h.publish(false);

    let cases = [
        (99, request(0, 0), ValidationErrorKind::PanelNotFound),
        (1, request(-1, 0), ValidationErrorKind::NegativeInterval),
        (1, request(0, -5), ValidationErrorKind::NegativeMaxDataPoints),
    ];
    for (panel_id, query, expected) in cases {
        let err = h
            .service
            .get_query_data_response(ACCESS_TOKEN, panel_id, &query)
            .await
            .unwrap_err();
        assert_eq!(validation_kind(err), expected);
    }
}

#[tokio::test]
async fn test_query_without_datasource_is_not_authorized() {
    let dash = dashboard_with(
        DASHBOARD_UID,
        json!({"panels": [{"id": 5, "targets": [{"refId": "A"}]}]}),
    );
    let h = Harness::new(vec![dash]);
    h.publish(false);

    let err = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 5, &request(0, 0))
        .await
        .unwrap_err();

    assert_eq!(validation_kind(err), ValidationErrorKind::DatasourceNotPermitted);
    assert!(h.query_data.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_time_settings_are_rejected() {
    let h = Harness::new(vec![dashboard()]);
    let record = PublicDashboard {
        time_settings: TimeSettings::new("now", "now-1h"),
        ..h.publish(false)
    };
    h.public_dashboards.insert(record).unwrap();

    let err = h
        .service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(0, 0))
        .await
        .unwrap_err();
    assert_eq!(validation_kind(err), ValidationErrorKind::InvalidTimeRange);
}

#[tokio::test]
async fn test_backend_failure_is_upstream() {
    struct Failing;

    #[async_trait]
    impl QueryDataService for Failing {
        async fn execute(
            &self,
            _request: &MetricRequest,
            _context: &ExecutionContext,
        ) -> anyhow::Result<QueryDataResponse> {
            Err(anyhow::anyhow!("backend unavailable"))
        }
    }

    let public_dashboards = Arc::new(InMemoryPublicDashboardStore::new());
    public_dashboards
        .insert(public_dashboard("pd1", DASHBOARD_UID, ACCESS_TOKEN, true))
        .unwrap();
    let service = PublicDashboardService::new(
        Arc::new(InMemoryDashboardStore::with_dashboards([dashboard()])),
        public_dashboards,
        Arc::new(InMemoryAnnotationRepository::default()),
        Arc::new(Failing),
    );

    let err = service
        .get_query_data_response(ACCESS_TOKEN, 1, &request(0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, PublicDashboardError::Upstream { .. }));
}
