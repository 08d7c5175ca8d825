use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use ragdb_core::error::{Error, Result};
use ragdb_core::filter::FilterSpec;
use ragdb_core::traits::VectorBackend;
use ragdb_core::types::{
    ChunkId, CollectionInfo, CollectionStatus, Distance, FailedRecord, Payload, SearchResult, UpsertReport,
    VectorRecord,
};

use crate::filter as payload_filter;
use crate::rank;
use crate::similarity::cosine;

struct StoredPoint {
    vector: Vec<f32>,
    payload: Payload,
}

struct MemoryCollection {
    dimension: usize,
    points: BTreeMap<ChunkId, StoredPoint>,
}

/// Brute-force cosine engine over one named collection.
///
/// Points live behind a `RwLock`, so searches run concurrently with each
/// other and an upsert holds the write lock only while applying its batch.
pub struct MemoryBackend {
    name: String,
    collection: RwLock<Option<MemoryCollection>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), collection: RwLock::new(None) }
    }

    fn missing(&self) -> Error {
        Error::NotFound(format!("collection '{}'", self.name))
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    async fn create_collection(&self, dimension: usize, _distance: Distance) -> Result<()> {
        if dimension == 0 {
            return Err(Error::Configuration("collection dimension must be greater than 0".into()));
        }
        let mut guard = self.collection.write();
        match guard.as_ref() {
            Some(existing) if existing.dimension != dimension => {
                warn!(collection = %self.name, existing = existing.dimension, requested = dimension, "collection exists with another dimension");
            }
            Some(_) => {}
            None => {
                *guard = Some(MemoryCollection { dimension, points: BTreeMap::new() });
                debug!(collection = %self.name, dimension, "created in-memory collection");
            }
        }
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertReport> {
        let mut guard = self.collection.write();
        let collection = guard.as_mut().ok_or_else(|| self.missing())?;
        let mut report = UpsertReport::default();
        for record in records {
            if record.vector.len() != collection.dimension {
                let error = Error::DimensionMismatch { expected: collection.dimension, actual: record.vector.len() };
                report.failed.push(FailedRecord { id: record.id, error });
                continue;
            }
            collection
                .points
                .insert(record.id.clone(), StoredPoint { vector: record.vector, payload: record.payload });
            report.applied.push(record.id);
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
        let guard = self.collection.read();
        let collection = guard.as_ref().ok_or_else(|| self.missing())?;
        if vector.len() != collection.dimension {
            return Err(Error::DimensionMismatch { expected: collection.dimension, actual: vector.len() });
        }
        if top_k == 0 {
            return Ok(vec![]);
        }
        let hits = collection
            .points
            .iter()
            .filter(|(_, point)| filter.map_or(true, |f| payload_filter::matches(f, &point.payload)))
            .map(|(id, point)| SearchResult {
                id: id.clone(),
                score: cosine(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();
        Ok(rank::finish(hits, top_k, score_threshold))
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let guard = self.collection.read();
        let collection = guard.as_ref().ok_or_else(|| self.missing())?;
        let count = collection.points.len() as u64;
        Ok(CollectionInfo {
            name: self.name.clone(),
            vector_count: count,
            point_count: count,
            status: CollectionStatus::Green,
        })
    }

    async fn delete_collection(&self) -> Result<()> {
        *self.collection.write() = None;
        Ok(())
    }
}
