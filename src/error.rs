//! Error types for kindred.
//!
//! Three families, one per phase:
//!
//! - [`BuildError`]: the offline batch job. Fatal; nothing is persisted.
//! - [`LoadError`]: acquiring a serialized index at serve time. Recoverable.
//! - [`ResolveError`]: ordinary user-facing query outcomes, not faults.
//!
//! [`QueryError`] wraps [`ResolveError`] for callers going through a serving
//! handle, adding the not-ready states.

use crate::persistence::PersistenceError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the index build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No item records to build from.
    #[error("catalog: descriptor corpus is empty")]
    EmptyCorpus,

    /// An item record lacks a required field (or it is empty).
    #[error("catalog: record {record} is missing required field `{field}`")]
    MissingField { record: usize, field: String },

    /// Catalog input could not be parsed.
    #[error("catalog: {0}")]
    Catalog(String),

    /// Build parameters out of range.
    #[error("config: {0}")]
    InvalidConfig(String),

    /// Reading the catalog or writing the artifact failed.
    #[error("io: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or writing the index artifact failed.
    #[error("write: {0}")]
    Persist(#[from] PersistenceError),
}

/// Errors from acquiring an index at serve time.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be reached or holds nothing yet. Retry later.
    #[error("index unavailable from {origin}: {reason}")]
    Unavailable { origin: String, reason: String },

    /// The bytes were fetched but do not form a valid index.
    #[error("index from {origin} is corrupt: {error}")]
    Corrupt {
        origin: String,
        #[source]
        error: PersistenceError,
    },
}

impl LoadError {
    /// Whether a later retry can plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Unavailable { .. })
    }
}

/// Outcomes of a query that do not produce recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Query was empty after trimming.
    #[error("query is empty")]
    EmptyQuery,
    /// No title contains the query.
    #[error("no title matches '{0}'")]
    NotFound(String),
}

/// Queries through a serving handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// No load has been attempted yet.
    #[error("index not loaded yet")]
    NotLoaded,

    /// The last load failed and no earlier index is available.
    #[error("index failed to load: {reason}")]
    Failed { reason: String, retryable: bool },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_retryability() {
        let missing = LoadError::Unavailable {
            origin: "file:idx".into(),
            reason: "not found".into(),
        };
        assert!(missing.is_retryable());

        let corrupt = LoadError::Corrupt {
            origin: "file:idx".into(),
            error: PersistenceError::BadMagic,
        };
        assert!(!corrupt.is_retryable());
    }

    #[test]
    fn build_error_names_stage() {
        let e = BuildError::MissingField {
            record: 3,
            field: "title".into(),
        };
        assert!(e.to_string().starts_with("catalog:"));
        assert!(e.to_string().contains("record 3"));
    }
}
