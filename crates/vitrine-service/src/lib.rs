//! # vitrine-service
//!
//! Orchestration of public dashboards.
//!
//! [`PublicDashboardService`] ties the pure algorithms of `vitrine-query` and
//! `vitrine-policy` to the collaborators declared in [`store`]:
//!
//! - owners save, list and probe public dashboard configurations; new records
//!   get their identifiers from [`TokenLifecycleManager`]
//! - anonymous callers fetch panel data through an access token: the panel's
//!   visible queries are extracted, clamped to a safe resolution, authorized
//!   against a context built from the dashboard, dispatched per datasource and
//!   sanitized
//! - anonymous callers fetch annotations, resolved by [`AnnotationResolver`]
//!
//! The [`memory`] module provides process-local collaborators.

pub mod annotations;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod tokens;

pub use annotations::AnnotationResolver;
pub use error::{PublicDashboardError, Result};
pub use memory::{
    EchoQueryDataService, InMemoryAnnotationRepository, InMemoryDashboardStore,
    InMemoryPublicDashboardStore,
};
pub use service::{PublicDashboardService, is_enabled_changed};
pub use store::{AnnotationRepository, DashboardStore, PublicDashboardStore, QueryDataService};
pub use tokens::{
    AccessTokenGenerator, IdGenerator, IdentifierKind, ShortUidGenerator, TokenLifecycleManager,
};
