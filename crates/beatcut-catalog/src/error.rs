//! Catalog error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while reading or writing the clip catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog database not found: {0}")]
    DatabaseNotFound(PathBuf),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid clip record: {0}")]
    InvalidRecord(String),

    #[error("Corrupt embedding for clip {clip_id}: {len} bytes")]
    CorruptEmbedding { clip_id: String, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}
