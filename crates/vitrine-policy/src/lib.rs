//! Vitrine policy
//!
//! Anonymous callers of a public dashboard never carry an identity. Instead,
//! every request is authorized against an [`ExecutionContext`] built from the
//! dashboard itself by [`AnonymousContextBuilder`]: read-only, scoped to the
//! datasources the dashboard's visible queries reference, and to dashboard
//! annotations.
//!
//! The [`validator`] module holds the rules checked before a dashboard is
//! published and before a panel query is dispatched.

pub mod anonymous;
pub mod error;
pub mod validator;

pub use anonymous::{AnonymousContextBuilder, ExecutionContext};
pub use error::{ValidationError, ValidationErrorKind};
pub use validator::{
    authorize_queries, is_valid_access_token, is_valid_uid, validate_dashboard_publishable,
    validate_query_request, validate_uid,
};
