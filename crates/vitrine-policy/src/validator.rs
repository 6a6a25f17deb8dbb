//! Validation rules for publishing a dashboard and serving its queries.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use vitrine_core::{Dashboard, PublicDashboardQuery, QueryDescriptor};

use crate::anonymous::ExecutionContext;
use crate::error::ValidationError;

const UID_REGEX: &str = r"^[a-zA-Z0-9\-_]{1,40}$";
const ACCESS_TOKEN_REGEX: &str = r"^[0-9a-f]{32}$";

static UID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| compile(UID_REGEX));
static ACCESS_TOKEN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(ACCESS_TOKEN_REGEX));

/// An identifier pattern that fails to compile rejects every identifier.
fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::error!(pattern, error = %err, "Invalid identifier pattern");
            None
        }
    }
}

/// Public dashboard uids: 1 to 40 letters, digits, `-` or `_`.
pub fn is_valid_uid(uid: &str) -> bool {
    UID_PATTERN.as_ref().is_some_and(|re| re.is_match(uid))
}

/// Access tokens: 32 lowercase hex characters.
pub fn is_valid_access_token(token: &str) -> bool {
    ACCESS_TOKEN_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(token))
}

pub fn validate_uid(uid: &str) -> Result<(), ValidationError> {
    if is_valid_uid(uid) {
        Ok(())
    } else {
        Err(ValidationError::invalid_uid(uid))
    }
}

/// A dashboard can only be published if it has no template variables.
pub fn validate_dashboard_publishable(dashboard: &Dashboard) -> Result<(), ValidationError> {
    if dashboard.has_template_variables() {
        return Err(ValidationError::template_variables_present(&dashboard.uid));
    }
    Ok(())
}

/// Reject negative resolution hints. Zero means "unset".
pub fn validate_query_request(query: &PublicDashboardQuery) -> Result<(), ValidationError> {
    if query.interval_ms < 0 {
        return Err(ValidationError::negative_interval(query.interval_ms));
    }
    if query.max_data_points < 0 {
        return Err(ValidationError::negative_max_data_points(
            query.max_data_points,
        ));
    }
    Ok(())
}

/// Every query must target a datasource the context may query.
pub fn authorize_queries(
    context: &ExecutionContext,
    queries: &[QueryDescriptor],
) -> Result<(), ValidationError> {
    for query in queries {
        match query.datasource_uid() {
            Some(uid) if context.can_query_datasource(&uid) => {}
            uid => {
                warn!(
                    org_id = context.org_id,
                    ref_id = query.ref_id().unwrap_or_default(),
                    datasource_uid = uid.as_deref().unwrap_or_default(),
                    "Rejecting query outside the anonymous grant"
                );
                return Err(ValidationError::datasource_not_permitted(uid.as_deref()));
            }
        }
    }
    Ok(())
}
