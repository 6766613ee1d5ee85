//! Typed errors at the Store's boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid blob json for {table}/{key}: {source}")]
    InvalidBlob {
        table: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no such local comment: {0}")]
    NoSuchComment(i64),

    #[error("no such section: {0}")]
    NoSuchSection(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
