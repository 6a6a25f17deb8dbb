//! `audit:` section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where configuration changes and anonymous reads are recorded.
///
/// With neither `stdout` nor `file` set, events only reach the tracing log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,

    /// Echo each event as a log line on stdout next to the file.
    pub stdout: bool,

    /// Append events to this JSON Lines file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stdout: false,
            file: None,
        }
    }
}
