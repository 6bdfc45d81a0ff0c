//! Storage error types for skillgraph-storage.
//!
//! [`StorageError`] covers every failure mode of the storage layer: the
//! SQLite driver, schema migrations, JSON columns, missing graphs, and
//! integrity violations found while reconstructing a stored graph.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization of a column failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A graph with the given ID was not found.
    #[error("graph not found: {0}")]
    GraphNotFound(i64),

    /// Stored rows do not form a consistent skill graph.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },
}
