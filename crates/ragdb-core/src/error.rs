use thiserror::Error;

use crate::types::FailedRecord;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Query text is empty")]
    EmptyQuery,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Upsert rejected {} record(s): {}", .failed.len(), failed_ids(.failed))]
    PartialUpsert { applied: usize, failed: Vec<FailedRecord> },

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn failed_ids(failed: &[FailedRecord]) -> String {
    failed.iter().map(|f| f.id.as_str()).collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
