use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// The directory holding the audit file could not be created.
    #[error("cannot create audit directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory event buffer was poisoned by a panicking writer.
    #[error("audit buffer unavailable: {0}")]
    Buffer(String),

    #[error("malformed audit record: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("audit file: {0}")]
    File(#[from] std::io::Error),
}
