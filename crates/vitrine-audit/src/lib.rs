//! # vitrine-audit
//!
//! Audit trail for public dashboards.
//!
//! Two families of events are recorded:
//! - configuration changes made by dashboard owners (created, updated,
//!   enabled, disabled)
//! - reads served to anonymous callers (query served or failed, annotations
//!   served)
//!
//! Events never carry access tokens. Public dashboard snapshots attached to
//! configuration events have the token removed.
//!
//! ## Event Types
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `PublicDashboardCreated` | A dashboard was published |
//! | `PublicDashboardUpdated` | Settings of a public dashboard changed |
//! | `PublicDashboardEnabled` | Anonymous access was switched on |
//! | `PublicDashboardDisabled` | Anonymous access was switched off |
//! | `QueryServed` | A panel query was answered |
//! | `QueryFailed` | A panel query failed |
//! | `AnnotationsServed` | Annotations were returned |
//!
//! ## Storage
//!
//! - **File output**: JSON Lines (one JSON object per line)
//! - **Console output**: human-readable log lines
//! - **Memory**: kept in process, for tests and embedding
//! - **Null**: discards everything

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::AuditError;
pub use event::{AuditEvent, AuditEventBuilder, AuditEventType};
pub use logger::{AuditFilter, AuditLogger};
pub use storage::{
    AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage,
};
