//! # vitrine-core
//!
//! Types shared across all Vitrine crates.
//!
//! - [`Dashboard`]: the stored dashboard document (free-form JSON plus identity)
//! - [`PublicDashboard`]: the configuration record that exposes a dashboard
//!   through an access token
//! - [`QueryDescriptor`] / [`DatasourceRef`]: the normalized view of one panel target
//! - [`QueryDataResponse`]: result frames keyed by refId
//! - [`DashAnnotation`] / [`AnnotationEvent`]: annotation definitions and results
//! - [`config`]: YAML configuration (`vitrine.yaml`)

pub mod annotation;
pub mod config;
pub mod dashboard;
pub mod frame;
pub mod public_dashboard;
pub mod query;

pub use annotation::{
    AnnotationEvent, AnnotationItem, AnnotationQuery, AnnotationTarget, AnnotationsQuery,
    DashAnnotation,
};
pub use config::{
    AuditConfig, ConfigError, ObservabilityConfig, QueryConfig, StoreConfig, TokenConfig,
    VitrineConfig,
};
pub use dashboard::Dashboard;
pub use frame::{DataFrame, DataResponse, Field, FrameMeta, QueryDataResponse};
pub use public_dashboard::{
    PublicDashboard, PublicDashboardListItem, PublicDashboardQuery, SavePublicDashboardCommand,
    TimeSettings,
};
pub use query::{DatasourceRef, MetricRequest, QueryDescriptor, TimeRange, PUBLIC_DATASOURCE_TYPE};
