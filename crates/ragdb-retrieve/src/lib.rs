//! ragdb-retrieve
//!
//! Query-time retrieval (embed, search, assemble context) and the ingestion
//! pipeline that fills the store (load, chunk, embed, upsert).

pub mod ingest;
pub mod retriever;

pub use ingest::{DocumentFailure, IngestReport, Ingestor};
pub use retriever::{chapter_filter, CHAPTER_KEY, Retrieval, RetrievedContext, Retriever, SourceRef, NO_RELEVANT_CONTENT};
