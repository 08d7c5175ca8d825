//! ragdb-core
//!
//! Shared data model, error taxonomy and collaborator traits for the retrieval
//! stack, plus the text chunker and the filesystem document source.

pub mod chunker;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod traits;
pub mod types;

pub use chunker::{ChunkingConfig, TextChunker};
pub use error::{Error, Result};
pub use filter::{Condition, FilterClause, FilterSpec, MatchValue};
pub use types::{
    CollectionInfo, CollectionStatus, Distance, Document, FailedRecord, Metadata, Payload,
    SearchResult, TextChunk, UpsertReport, VectorRecord,
};
