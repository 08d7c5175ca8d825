use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ragdb_core::config::{BackendPreference, StoreConfig};
use ragdb_core::error::{Error, Result};
use ragdb_core::filter::FilterSpec;
use ragdb_core::traits::VectorBackend;
use ragdb_core::types::{CollectionInfo, Distance, SearchResult, UpsertReport, VectorRecord};

use crate::memory::MemoryBackend;
use crate::qdrant::QdrantBackend;

/// Which engine a store ended up with. Descriptive only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Qdrant,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Qdrant => "qdrant",
            Self::Memory => "in-memory",
        })
    }
}

/// The vector store for one collection.
///
/// The engine is chosen once by [`VectorStore::connect`]: Qdrant when it is
/// configured and reachable, the in-memory engine otherwise. Later failures
/// are returned to the caller; the store never switches engines afterwards.
pub struct VectorStore {
    backend: Box<dyn VectorBackend>,
    kind: BackendKind,
    collection: String,
}

impl VectorStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        match config.backend {
            BackendPreference::Memory => Ok(Self::in_memory(&config.collection)),
            BackendPreference::Qdrant => {
                if config.is_placeholder() {
                    return Err(Error::Configuration(format!("store url '{}' is a placeholder", config.url)));
                }
                let backend = QdrantBackend::new(config)?;
                backend.probe().await?;
                Ok(Self::qdrant(backend, &config.collection))
            }
            BackendPreference::Auto => {
                if config.is_placeholder() {
                    warn!(url = %config.url, "store credentials are placeholders, using the in-memory engine");
                    return Ok(Self::in_memory(&config.collection));
                }
                let backend = QdrantBackend::new(config)?;
                match backend.probe().await {
                    Ok(()) => Ok(Self::qdrant(backend, &config.collection)),
                    Err(error) => {
                        warn!(%error, "qdrant unreachable, falling back to the in-memory engine");
                        Ok(Self::in_memory(&config.collection))
                    }
                }
            }
        }
    }

    pub fn in_memory(collection: &str) -> Self {
        info!(collection, backend = %BackendKind::Memory, "vector store ready");
        Self::with_backend(Box::new(MemoryBackend::new(collection)), BackendKind::Memory, collection)
    }

    fn qdrant(backend: QdrantBackend, collection: &str) -> Self {
        info!(collection, url = backend.url(), backend = %BackendKind::Qdrant, "vector store ready");
        Self::with_backend(Box::new(backend), BackendKind::Qdrant, collection)
    }

    pub fn with_backend(backend: Box<dyn VectorBackend>, kind: BackendKind, collection: &str) -> Self {
        Self { backend, kind, collection: collection.to_string() }
    }

    pub fn kind(&self) -> BackendKind { self.kind }

    pub fn collection(&self) -> &str { &self.collection }

    /// `create_collection` with the cosine metric.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        self.create_collection(dimension, Distance::Cosine).await
    }
}

#[async_trait]
impl VectorBackend for VectorStore {
    async fn create_collection(&self, dimension: usize, distance: Distance) -> Result<()> {
        debug!(collection = %self.collection, dimension, "create_collection");
        self.backend.create_collection(dimension, distance).await
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertReport> {
        let submitted = records.len();
        let report = self.backend.upsert(records).await?;
        if report.is_complete() {
            debug!(collection = %self.collection, submitted, "upsert");
        } else {
            warn!(collection = %self.collection, submitted, failed = report.failed.len(), "upsert rejected records");
        }
        Ok(report)
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: Option<f32>,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<SearchResult>> {
        let results = self.backend.search(vector, top_k, score_threshold, filter).await?;
        debug!(collection = %self.collection, top_k, hits = results.len(), "search");
        Ok(results)
    }

    async fn collection_info(&self) -> Result<CollectionInfo> { self.backend.collection_info().await }

    async fn delete_collection(&self) -> Result<()> {
        info!(collection = %self.collection, backend = %self.kind, "deleting collection");
        self.backend.delete_collection().await
    }
}
