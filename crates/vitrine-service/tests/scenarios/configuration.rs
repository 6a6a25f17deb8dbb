//! Saving, listing and probing public dashboard configurations.

use pretty_assertions::assert_eq;
use serde_json::json;
use vitrine_audit::AuditEventType;
use vitrine_core::{SavePublicDashboardCommand, TimeSettings};
use vitrine_policy::{ValidationErrorKind, is_valid_access_token, is_valid_uid};
use vitrine_service::{IdentifierKind, PublicDashboardError, TokenLifecycleManager};

use super::common::*;

fn command(is_enabled: bool) -> SavePublicDashboardCommand {
    SavePublicDashboardCommand {
        dashboard_uid: DASHBOARD_UID.to_string(),
        org_id: ORG_ID,
        user_id: 7,
        uid: None,
        is_enabled,
        annotations_enabled: false,
        time_settings: None,
    }
}

// =============================================================================
// CREATE
// =============================================================================

#[tokio::test]
async fn test_create_generates_identifiers() {
    let h = Harness::new(vec![dashboard()]);

    let saved = h.service.save(command(true)).await.unwrap();

    assert!(is_valid_uid(&saved.uid), "{}", saved.uid);
    assert!(is_valid_access_token(&saved.access_token));
    assert_eq!(saved.time_settings, TimeSettings::default());
    assert_eq!(saved.created_by, 7);
    assert_eq!(saved.updated_by, None);
    assert_eq!(h.public_dashboards.records(), vec![saved]);
    assert_eq!(
        h.audit_types(),
        vec![AuditEventType::PublicDashboardCreated, AuditEventType::PublicDashboardEnabled]
    );
}

#[tokio::test]
async fn test_create_disabled_is_not_an_enabled_change() {
    let h = Harness::new(vec![dashboard()]);

    h.service.save(command(false)).await.unwrap();

    assert_eq!(h.audit_types(), vec![AuditEventType::PublicDashboardCreated]);
}

#[tokio::test]
async fn test_supplied_uid_bypasses_generation() {
    let tokens = TokenLifecycleManager::new().with_uid_generator(Scripted::new(&[]));
    let h = Harness::with_tokens(vec![dashboard()], tokens);

    let saved = h
        .service
        .save(SavePublicDashboardCommand {
            uid: Some(DASHBOARD_UID.to_string()),
            ..command(true)
        })
        .await
        .unwrap();

    assert_eq!(saved.uid, DASHBOARD_UID);
}

#[tokio::test]
async fn test_template_variables_are_rejected() {
    let dash = dashboard_with(
        DASHBOARD_UID,
        json!({"templating": {"list": [{"name": "job"}]}, "panels": []}),
    );
    let h = Harness::new(vec![dash]);

    let err = h.service.save(command(true)).await.unwrap_err();

    let validation = err.as_validation().unwrap();
    assert_eq!(validation.kind, ValidationErrorKind::TemplateVariablesPresent);
    assert!(validation.message.contains("template variables"));
    assert!(h.public_dashboards.records().is_empty());
    assert!(h.audit.events().is_empty());
}

#[tokio::test]
async fn test_missing_dashboard_is_not_found() {
    let h = Harness::new(vec![]);

    let err = h.service.save(command(true)).await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_supplied_uid() {
    let h = Harness::new(vec![dashboard()]);

    let err = h
        .service
        .save(SavePublicDashboardCommand {
            uid: Some("not a uid".to_string()),
            ..command(true)
        })
        .await
        .unwrap_err();

    assert_eq!(err.as_validation().unwrap().kind, ValidationErrorKind::InvalidUid);
}

// =============================================================================
// IDENTIFIER COLLISIONS
// =============================================================================

#[tokio::test]
async fn test_uid_collisions_retry_until_free() {
    let tokens =
        TokenLifecycleManager::new().with_uid_generator(Scripted::new(&["taken1", "taken2", "fresh"]));
    let h = Harness::with_tokens(vec![dashboard()], tokens);
    for (uid, token) in [("taken1", "a".repeat(32)), ("taken2", "b".repeat(32))] {
        h.public_dashboards
            .insert(public_dashboard(uid, "elsewhere", &token, true))
            .unwrap();
    }

    let saved = h.service.save(command(true)).await.unwrap();

    assert_eq!(saved.uid, "fresh");
}

#[tokio::test]
async fn test_uid_generation_gives_up_after_three_collisions() {
    let tokens = TokenLifecycleManager::new()
        .with_uid_generator(Scripted::new(&["taken1", "taken1", "taken1", "fresh"]));
    let h = Harness::with_tokens(vec![dashboard()], tokens);
    h.public_dashboards
        .insert(public_dashboard("taken1", "elsewhere", &"a".repeat(32), true))
        .unwrap();

    let err = h.service.save(command(true)).await.unwrap_err();

    assert!(matches!(
        err,
        PublicDashboardError::GenerationFailed {
            kind: IdentifierKind::Uid,
            attempts: 3
        }
    ));
    assert_eq!(h.public_dashboards.records().len(), 1);
}

#[tokio::test]
async fn test_access_token_collisions_retry_until_free() {
    let fresh = "c".repeat(32);
    let tokens = TokenLifecycleManager::new().with_access_token_generator(Scripted::new(&[
        ACCESS_TOKEN,
        ACCESS_TOKEN,
        fresh.as_str(),
    ]));
    let h = Harness::with_tokens(vec![dashboard()], tokens);
    h.public_dashboards
        .insert(public_dashboard("other", "elsewhere", ACCESS_TOKEN, true))
        .unwrap();

    let saved = h.service.save(command(true)).await.unwrap();

    assert_eq!(saved.access_token, fresh);
}

// =============================================================================
// UPDATE
// =============================================================================

#[tokio::test]
async fn test_update_changes_only_mutable_fields() {
    let h = Harness::new(vec![dashboard()]);
    let created = h.service.save(command(true)).await.unwrap();

    let updated = h
        .service
        .save(SavePublicDashboardCommand {
            user_id: 9,
            annotations_enabled: true,
            time_settings: Some(TimeSettings::new("now-12h", "now")),
            ..command(false)
        })
        .await
        .unwrap();

    assert_eq!(updated.uid, created.uid);
    assert_eq!(updated.access_token, created.access_token);
    assert_eq!(updated.created_by, created.created_by);
    assert_eq!(updated.created_at, created.created_at);
    assert!(!updated.is_enabled);
    assert!(updated.annotations_enabled);
    assert_eq!(updated.time_settings, TimeSettings::new("now-12h", "now"));
    assert_eq!(updated.updated_by, Some(9));
    assert!(updated.updated_at.is_some());
    assert_eq!(
        h.audit_types(),
        vec![
            AuditEventType::PublicDashboardCreated,
            AuditEventType::PublicDashboardEnabled,
            AuditEventType::PublicDashboardUpdated,
            AuditEventType::PublicDashboardDisabled,
        ]
    );
}

#[tokio::test]
async fn test_update_without_time_settings_resets_them() {
    let h = Harness::new(vec![dashboard()]);
    h.service
        .save(SavePublicDashboardCommand {
            time_settings: Some(TimeSettings::new("now-12h", "now")),
            ..command(true)
        })
        .await
        .unwrap();

    let updated = h.service.save(command(true)).await.unwrap();

    assert_eq!(updated.time_settings, TimeSettings::default());
    assert_eq!(h.audit_types().len(), 3);
}

#[tokio::test]
async fn test_update_by_uid_of_another_dashboard_is_rejected() {
    let h = Harness::new(vec![dashboard(), dashboard_with("other", json!({}))]);
    let created = h.service.save(command(true)).await.unwrap();

    let err = h
        .service
        .save(SavePublicDashboardCommand {
            uid: Some(created.uid.clone()),
            dashboard_uid: "other".to_string(),
            ..command(true)
        })
        .await
        .unwrap_err();

    assert_eq!(err.as_validation().unwrap().kind, ValidationErrorKind::DashboardMismatch);
    assert_eq!(h.public_dashboards.records(), vec![created]);
}

#[tokio::test]
async fn test_new_uid_for_an_already_public_dashboard_is_rejected() {
    let h = Harness::new(vec![dashboard()]);
    let created = h.service.save(command(true)).await.unwrap();

    let err = h
        .service
        .save(SavePublicDashboardCommand {
            uid: Some("otheruid".to_string()),
            ..command(true)
        })
        .await
        .unwrap_err();

    assert_eq!(err.as_validation().unwrap().kind, ValidationErrorKind::DashboardMismatch);
    assert_eq!(h.public_dashboards.records(), vec![created.clone()]);

    // the record's own uid still updates it
    let updated = h
        .service
        .save(SavePublicDashboardCommand {
            uid: Some(created.uid.clone()),
            ..command(false)
        })
        .await
        .unwrap();
    assert_eq!(updated.uid, created.uid);
    assert!(!updated.is_enabled);
    assert_eq!(h.public_dashboards.records().len(), 1);
}

// =============================================================================
// LISTING AND PROBES
// =============================================================================

#[tokio::test]
async fn test_list_orders_enabled_then_titled_then_by_title() {
    let h = Harness::new(vec![
        dashboard_with("a", json!({"title": "Alpha"})),
        dashboard_with("b", json!({"title": "Beta"})),
        dashboard_with("z", json!({"title": "Zulu"})),
    ]);
    let records = [
        ("pd-a", "a", false),
        ("pd-z", "z", true),
        ("pd-gone", "gone", true),
        ("pd-b", "b", true),
        ("pd-gone2", "gone2", false),
    ];
    for (index, (uid, dashboard_uid, enabled)) in records.into_iter().enumerate() {
        let token = format!("{index:032x}");
        h.public_dashboards
            .insert(public_dashboard(uid, dashboard_uid, &token, enabled))
            .unwrap();
    }

    let items = h.service.list(ORG_ID).await.unwrap();

    let order: Vec<(&str, Option<&str>)> = items
        .iter()
        .map(|i| (i.uid.as_str(), i.title.as_deref()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("pd-b", Some("Beta")),
            ("pd-z", Some("Zulu")),
            ("pd-gone", None),
            ("pd-a", Some("Alpha")),
            ("pd-gone2", None),
        ]
    );
    assert!(h.service.list(ORG_ID + 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_existence_probes() {
    let h = Harness::new(vec![dashboard()]);
    let record = h.publish(false);

    assert!(h.service.exists_enabled_by_access_token(ACCESS_TOKEN).await.unwrap());
    assert!(!h.service.exists_enabled_by_access_token("").await.unwrap());
    assert!(h
        .service
        .exists_enabled_by_dashboard_uid(ORG_ID, DASHBOARD_UID)
        .await
        .unwrap());
    assert_eq!(h.service.get_org_id_by_access_token(ACCESS_TOKEN).await.unwrap(), ORG_ID);
    assert!(h
        .service
        .get_org_id_by_access_token(&"f".repeat(32))
        .await
        .unwrap_err()
        .is_not_found());

    let (public_dashboard, dashboard) = h
        .service
        .find_public_dashboard_and_dashboard_by_access_token(ACCESS_TOKEN)
        .await
        .unwrap();
    assert_eq!(public_dashboard, record);
    assert_eq!(dashboard.uid, DASHBOARD_UID);

    h.public_dashboards
        .insert(vitrine_core::PublicDashboard {
            is_enabled: false,
            ..record
        })
        .unwrap();
    assert!(!h.service.exists_enabled_by_access_token(ACCESS_TOKEN).await.unwrap());
    assert!(!h
        .service
        .exists_enabled_by_dashboard_uid(ORG_ID, DASHBOARD_UID)
        .await
        .unwrap());
    assert!(h
        .service
        .get_org_id_by_access_token(ACCESS_TOKEN)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(h
        .service
        .find_by_dashboard_uid(ORG_ID, DASHBOARD_UID)
        .await
        .is_ok());
}
