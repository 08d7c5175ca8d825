//! Domain types shared by the chunker, the vector engines and the retriever.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

pub type ChunkId = String;
pub type Metadata = serde_json::Map<String, Value>;
pub type Payload = serde_json::Map<String, Value>;

pub const UNKNOWN_SOURCE: &str = "unknown";

/// A loaded source document. `metadata` always carries a `source` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        Self { content: content.into(), metadata }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata entry, or `"unknown"` when absent or not a string.
    pub fn source(&self) -> &str {
        self.metadata.get("source").and_then(Value::as_str).unwrap_or(UNKNOWN_SOURCE)
    }
}

/// A bounded slice of a document, positioned within the document's final chunk list.
///
/// - `id`: `"{doc_id}_{chunk_index}"`, or a stable hash of the source plus the index
/// - `metadata`: document metadata merged with `chunk_index`, `total_chunks`,
///   `doc_id` and `chunk_source` (chunk keys win)
/// - `chunk_index`/`total_chunks`: 0-based position and count after empty chunks are dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: Metadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl TextChunk {
    pub fn doc_id(&self) -> Option<&str> {
        self.metadata.get("doc_id").and_then(Value::as_str)
    }
}

/// A stored point: id, fixed-length vector and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: ChunkId,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl VectorRecord {
    pub fn new(id: impl Into<ChunkId>, vector: Vec<f32>, payload: Payload) -> Self {
        Self { id: id.into(), vector, payload }
    }

    /// Builds the record for an embedded chunk with the payload shape
    /// `{content, metadata, doc_id, chunk_index, total_chunks}`.
    pub fn from_chunk(chunk: &TextChunk, vector: Vec<f32>) -> Self {
        let mut payload = Payload::new();
        payload.insert("content".into(), Value::String(chunk.content.clone()));
        payload.insert("metadata".into(), Value::Object(chunk.metadata.clone()));
        payload.insert(
            "doc_id".into(),
            chunk.doc_id().map_or(Value::Null, |d| Value::String(d.to_string())),
        );
        payload.insert("chunk_index".into(), Value::from(chunk.chunk_index));
        payload.insert("total_chunks".into(), Value::from(chunk.total_chunks));
        Self { id: chunk.id.clone(), vector, payload }
    }
}

/// Pairs chunks with the vectors the embedding provider returned for them.
pub fn records_from_chunks(chunks: &[TextChunk], vectors: Vec<Vec<f32>>) -> Result<Vec<VectorRecord>> {
    if chunks.len() != vectors.len() {
        return Err(Error::Embedding(format!(
            "provider returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }
    Ok(chunks.iter().zip(vectors).map(|(c, v)| VectorRecord::from_chunk(c, v)).collect())
}

/// One ranked hit. `score` is cosine similarity; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: ChunkId,
    pub score: f32,
    pub payload: Payload,
}

impl SearchResult {
    pub fn content(&self) -> &str {
        self.payload.get("content").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.payload.get("metadata").and_then(Value::as_object)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Green,
    Yellow,
    Grey,
    Red,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Grey => "grey",
            Self::Red => "red",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub vector_count: u64,
    pub point_count: u64,
    pub status: CollectionStatus,
}

/// A record an upsert could not apply, with the reason.
#[derive(Debug)]
pub struct FailedRecord {
    pub id: ChunkId,
    pub error: Error,
}

/// Outcome of one upsert call. Records are applied independently, so a
/// rejected record never prevents the others from landing.
#[derive(Debug, Default)]
pub struct UpsertReport {
    pub applied: Vec<ChunkId>,
    pub failed: Vec<FailedRecord>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool { self.failed.is_empty() }

    /// Converts per-record failures into `Error::PartialUpsert`.
    pub fn ensure_complete(self) -> Result<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(Error::PartialUpsert { applied: self.applied.len(), failed: self.failed })
        }
    }
}
