//! Error types for the decision core.
//!
//! Collaborators report [`CollaboratorError`]; the core lifts those into
//! [`TriageError`] at each call site so the state machine can pick the
//! fallback transition that matches the failing system.

use std::time::Duration;
use thiserror::Error;

use crate::stage::IllegalTransition;

/// Result type alias for core operations
pub type TriageResult<T> = Result<T, TriageError>;

/// Failure reported by an external collaborator (embedding, index,
/// ticketing, knowledge API).
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// Transport-level failure (connection refused, DNS, TLS)
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("response parse error: {0}")]
    Parse(String),

    /// Call did not finish within its budget
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Backend answered but refused the operation; message is user-facing
    #[error("{0}")]
    Rejected(String),
}

impl CollaboratorError {
    /// Short machine-readable kind, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Status { .. } => "status",
            Self::Parse(_) => "parse",
            Self::Timeout(_) => "timeout",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Errors surfaced by the decision core
#[derive(Debug, Error)]
pub enum TriageError {
    /// Embedding or vector-index collaborator failed or timed out
    #[error("match unavailable: {0}")]
    MatchUnavailable(#[source] CollaboratorError),

    /// Catalog lookup could not be performed
    #[error("resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// Ticket creation, fetch or update failed
    #[error("ticketing failure: {0}")]
    TicketingFailure(#[source] CollaboratorError),

    /// Deeper remedy (SOP) could not be fetched
    #[error("deeper remedy unavailable: {0}")]
    RemedyUnavailable(#[source] CollaboratorError),

    /// HR / WorkElevate knowledge answer could not be fetched
    #[error("knowledge answer unavailable: {0}")]
    KnowledgeUnavailable(#[source] CollaboratorError),

    /// Ticket lookup/update request was malformed or failed
    #[error("ticket lookup failed: {0}")]
    LookupFailure(String),

    /// A stage change violated the transition table
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// Configuration was invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Software catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog entry has an empty key")]
    EmptyKey,
}
