//! Error types for the public dashboard service.

use thiserror::Error;
use vitrine_policy::ValidationError;

use crate::tokens::IdentifierKind;

/// Errors returned by [`PublicDashboardService`](crate::PublicDashboardService).
#[derive(Debug, Error)]
pub enum PublicDashboardError {
    /// Missing record, disabled record, missing dashboard or empty token.
    /// Anonymous callers cannot tell these apart.
    #[error("public dashboard not found")]
    NotFound,

    /// A publication or request rule was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator (store, annotation repository, query backend) failed.
    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// No unused identifier was found within the retry budget.
    #[error("failed to generate a unique {kind} after {attempts} attempts")]
    GenerationFailed { kind: IdentifierKind, attempts: u32 },
}

impl PublicDashboardError {
    /// Wrap a collaborator failure with what was being attempted.
    pub fn upstream(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Upstream {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// The validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T, E = PublicDashboardError> = std::result::Result<T, E>;
