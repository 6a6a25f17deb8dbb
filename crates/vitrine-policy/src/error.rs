//! Validation error types.
//!
//! Every error names the rule that was violated so callers can surface it
//! as-is to the dashboard owner.

use std::fmt;

/// Error type for validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The kind of validation error.
    pub kind: ValidationErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // =========================================================================
    // PUBLICATION ERRORS
    // =========================================================================

    /// Create a template variables error.
    pub fn template_variables_present(dashboard_uid: &str) -> Self {
        Self::new(
            ValidationErrorKind::TemplateVariablesPresent,
            format!(
                "Dashboard '{}' has template variables, which are not supported for public dashboards",
                dashboard_uid
            ),
        )
    }

    /// Create an invalid uid error.
    pub fn invalid_uid(uid: &str) -> Self {
        Self::new(
            ValidationErrorKind::InvalidUid,
            format!(
                "'{}' is not a valid public dashboard uid (1-40 letters, digits, '-' or '_')",
                uid
            ),
        )
    }

    /// Create a dashboard mismatch error.
    pub fn dashboard_mismatch(uid: &str, dashboard_uid: &str) -> Self {
        Self::new(
            ValidationErrorKind::DashboardMismatch,
            format!(
                "Public dashboard '{}' does not belong to dashboard '{}'",
                uid, dashboard_uid
            ),
        )
    }

    // =========================================================================
    // QUERY ERRORS
    // =========================================================================

    /// Create a panel not found error.
    pub fn panel_not_found(panel_id: i64) -> Self {
        Self::new(
            ValidationErrorKind::PanelNotFound,
            format!("Panel {} was not found in the dashboard", panel_id),
        )
    }

    /// Create a negative interval error.
    pub fn negative_interval(interval_ms: i64) -> Self {
        Self::new(
            ValidationErrorKind::NegativeInterval,
            format!("intervalMs must not be negative, got {}", interval_ms),
        )
    }

    /// Create a negative max data points error.
    pub fn negative_max_data_points(max_data_points: i64) -> Self {
        Self::new(
            ValidationErrorKind::NegativeMaxDataPoints,
            format!("maxDataPoints must not be negative, got {}", max_data_points),
        )
    }

    /// Create an invalid time range error.
    pub fn invalid_time_range(reason: impl fmt::Display) -> Self {
        Self::new(
            ValidationErrorKind::InvalidTimeRange,
            format!("Invalid time range: {}", reason),
        )
    }

    /// Create a datasource not permitted error.
    pub fn datasource_not_permitted(uid: Option<&str>) -> Self {
        let message = match uid {
            Some(uid) => format!(
                "Datasource '{}' is not referenced by the dashboard and cannot be queried",
                uid
            ),
            None => "Query has no datasource and cannot be authorized".to_string(),
        };
        Self::new(ValidationErrorKind::DatasourceNotPermitted, message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    // =========================================================================
    // Publication errors
    // =========================================================================
    /// The dashboard declares template variables.
    TemplateVariablesPresent,
    /// A caller-supplied uid has the wrong format.
    InvalidUid,
    /// A public dashboard uid resolves to another dashboard.
    DashboardMismatch,

    // =========================================================================
    // Query errors
    // =========================================================================
    /// The requested panel does not exist.
    PanelNotFound,
    /// `intervalMs` is negative.
    NegativeInterval,
    /// `maxDataPoints` is negative.
    NegativeMaxDataPoints,
    /// The configured time range cannot be resolved.
    InvalidTimeRange,
    /// A query targets a datasource outside the anonymous grant.
    DatasourceNotPermitted,
}
