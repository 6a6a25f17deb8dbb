//! Public dashboard configuration records and the commands that produce them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time range configured for a public dashboard.
///
/// Both ends are time expressions (`now-6h`, `now`, epoch milliseconds or
/// RFC 3339). An empty value serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl TimeSettings {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    /// Both ends set to non-empty expressions.
    pub fn is_complete(&self) -> bool {
        matches!((&self.from, &self.to), (Some(f), Some(t)) if !f.is_empty() && !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// A persisted public dashboard configuration.
///
/// `uid`, `dashboard_uid`, `org_id`, `access_token`, `created_by` and
/// `created_at` are fixed at creation. Updates only touch `is_enabled`,
/// `annotations_enabled`, `time_settings` and the `updated_*` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDashboard {
    pub uid: String,
    pub dashboard_uid: String,
    pub org_id: i64,
    pub access_token: String,
    pub is_enabled: bool,
    pub annotations_enabled: bool,
    #[serde(default)]
    pub time_settings: TimeSettings,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Command to create or update the public dashboard of a dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePublicDashboardCommand {
    /// Dashboard being exposed.
    pub dashboard_uid: String,
    /// Organization of the dashboard.
    pub org_id: i64,
    /// User performing the change.
    pub user_id: i64,
    /// Existing public dashboard uid (update), or a caller-chosen uid for a new
    /// record. When absent on creation a uid is generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub annotations_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_settings: Option<TimeSettings>,
}

/// Resolution hints sent by the anonymous caller with a panel query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDashboardQuery {
    #[serde(default)]
    pub interval_ms: i64,
    #[serde(default)]
    pub max_data_points: i64,
}

/// One row of the per-organization listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDashboardListItem {
    pub uid: String,
    pub access_token: String,
    pub dashboard_uid: String,
    /// Title of the backing dashboard; `None` when it no longer exists.
    pub title: Option<String>,
    pub is_enabled: bool,
}
