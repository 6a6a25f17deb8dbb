//! Audit event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;
use vitrine_core::PublicDashboard;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // ===== Configuration events =====
    /// A public dashboard was created.
    PublicDashboardCreated,
    /// A public dashboard's settings were updated.
    PublicDashboardUpdated,
    /// Anonymous access was enabled.
    PublicDashboardEnabled,
    /// Anonymous access was disabled.
    PublicDashboardDisabled,

    // ===== Anonymous read events =====
    /// A panel query was answered.
    QueryServed,
    /// A panel query failed.
    QueryFailed,
    /// Annotations were returned.
    AnnotationsServed,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PublicDashboardCreated => write!(f, "PUBDASH_CREATED"),
            Self::PublicDashboardUpdated => write!(f, "PUBDASH_UPDATED"),
            Self::PublicDashboardEnabled => write!(f, "PUBDASH_ENABLED"),
            Self::PublicDashboardDisabled => write!(f, "PUBDASH_DISABLED"),
            Self::QueryServed => write!(f, "QUERY_SERVED"),
            Self::QueryFailed => write!(f, "QUERY_FAILED"),
            Self::AnnotationsServed => write!(f, "ANNOTATIONS_SERVED"),
        }
    }
}

/// An audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// Event type.
    pub event_type: AuditEventType,

    // ===== Core fields =====
    /// Organization owning the dashboard.
    pub org_id: i64,

    /// Dashboard the event relates to.
    pub dashboard_uid: String,

    /// Public dashboard uid, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dashboard_uid: Option<String>,

    /// User making a configuration change. Absent for anonymous reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    // ===== Read details =====
    /// Panel queried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<i64>,

    /// Number of queries dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_count: Option<u64>,

    /// Number of annotations returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_count: Option<u64>,

    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message (if event_type indicates failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    // ===== Change tracking =====
    /// Public dashboard before the change (token removed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_state: Option<Value>,

    /// Public dashboard after the change (token removed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_state: Option<Value>,

    /// Changed fields as `{field: {old, new}}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Value>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

impl AuditEvent {
    /// Create a new audit event with the given type and core fields.
    pub fn new(event_type: AuditEventType, org_id: i64, dashboard_uid: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            org_id,
            dashboard_uid: dashboard_uid.into(),
            public_dashboard_uid: None,
            user_id: None,
            panel_id: None,
            query_count: None,
            annotation_count: None,
            duration_ms: None,
            error: None,
            before_state: None,
            after_state: None,
            diff: None,
            meta: Value::Null,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(
        event_type: AuditEventType,
        org_id: i64,
        dashboard_uid: impl Into<String>,
    ) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, org_id, dashboard_uid)
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE org=... dashboard=... [pubdash=...] ...`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} org={} dashboard={}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
            self.org_id,
            self.dashboard_uid,
        );

        if let Some(ref uid) = self.public_dashboard_uid {
            line.push_str(&format!(" pubdash={}", uid));
        }

        if let Some(user_id) = self.user_id {
            line.push_str(&format!(" user={}", user_id));
        }

        if let Some(panel_id) = self.panel_id {
            line.push_str(&format!(" panel={}", panel_id));
        }

        if let Some(count) = self.query_count {
            line.push_str(&format!(" queries={}", count));
        }

        if let Some(count) = self.annotation_count {
            line.push_str(&format!(" annotations={}", count));
        }

        if let Some(duration) = self.duration_ms {
            line.push_str(&format!(" duration_ms={}", duration));
        }

        if let Some(ref error) = self.error {
            line.push_str(&format!(" error=\"{}\"", error.replace('"', "'")));
        }

        if let Some(obj) = self.diff.as_ref().and_then(Value::as_object) {
            let changed_fields: Vec<&str> = obj.keys().map(String::as_str).collect();
            if !changed_fields.is_empty() {
                line.push_str(&format!(" changed_fields=[{}]", changed_fields.join(",")));
            }
        }

        line
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    /// Create a new builder with required fields.
    pub fn new(event_type: AuditEventType, org_id: i64, dashboard_uid: impl Into<String>) -> Self {
        Self {
            event: AuditEvent::new(event_type, org_id, dashboard_uid),
        }
    }

    pub fn public_dashboard_uid(mut self, uid: impl Into<String>) -> Self {
        self.event.public_dashboard_uid = Some(uid.into());
        self
    }

    pub fn user_id(mut self, user_id: i64) -> Self {
        self.event.user_id = Some(user_id);
        self
    }

    pub fn panel_id(mut self, panel_id: i64) -> Self {
        self.event.panel_id = Some(panel_id);
        self
    }

    pub fn query_count(mut self, count: u64) -> Self {
        self.event.query_count = Some(count);
        self
    }

    pub fn annotation_count(mut self, count: u64) -> Self {
        self.event.annotation_count = Some(count);
        self
    }

    pub fn duration_ms(mut self, duration: u64) -> Self {
        self.event.duration_ms = Some(duration);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.event.error = Some(error.into());
        self
    }

    /// Attach the state before a change. The access token is removed.
    pub fn before(mut self, public_dashboard: &PublicDashboard) -> Self {
        self.event.before_state = Some(redacted_state(public_dashboard));
        self
    }

    /// Attach the state after a change. The access token is removed.
    pub fn after(mut self, public_dashboard: &PublicDashboard) -> Self {
        self.event.after_state = Some(redacted_state(public_dashboard));
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.event.meta = meta;
        self
    }

    /// Compute and set the diff from the before and after states.
    pub fn compute_diff(mut self) -> Self {
        if let (Some(before), Some(after)) = (&self.event.before_state, &self.event.after_state) {
            let diff = compute_json_diff(before, after);
            if !diff.is_null() {
                self.event.diff = Some(diff);
            }
        }
        self
    }

    /// Build the audit event.
    pub fn build(self) -> AuditEvent {
        self.event
    }
}

fn redacted_state(public_dashboard: &PublicDashboard) -> Value {
    let mut state = serde_json::to_value(public_dashboard).unwrap_or(Value::Null);
    if let Some(obj) = state.as_object_mut() {
        obj.remove("accessToken");
    }
    state
}

/// Compute a diff between two JSON objects.
///
/// Returns `{field: {"old": .., "new": ..}}` for every changed, added or
/// removed top-level field, or `null` when nothing changed.
pub fn compute_json_diff(before: &Value, after: &Value) -> Value {
    match (before, after) {
        (Value::Object(before_obj), Value::Object(after_obj)) => {
            let mut diff = Map::new();

            for (key, before_val) in before_obj {
                match after_obj.get(key) {
                    Some(after_val) if before_val == after_val => {}
                    after_val => {
                        diff.insert(
                            key.clone(),
                            json!({"old": before_val, "new": after_val.unwrap_or(&Value::Null)}),
                        );
                    }
                }
            }

            for (key, after_val) in after_obj {
                if !before_obj.contains_key(key) {
                    diff.insert(key.clone(), json!({"old": null, "new": after_val}));
                }
            }

            if diff.is_empty() {
                Value::Null
            } else {
                Value::Object(diff)
            }
        }
        _ if before == after => Value::Null,
        _ => json!({"old": before, "new": after}),
    }
}
