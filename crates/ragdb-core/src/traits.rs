use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::FilterSpec;
use crate::loader::LoadReport;
use crate::types::{CollectionInfo, Distance, SearchResult, UpsertReport, VectorRecord};

/// Text → fixed-length vector. Output length is `dim()` for every input.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn model_id(&self) -> &str;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop().ok_or_else(|| crate::error::Error::Embedding("empty embedding response".into()))
    }
}

/// The capability set every vector engine provides for one named collection.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Creates the collection unless it already exists.
    async fn create_collection(&self, dimension: usize, distance: Distance) -> Result<()>;
    /// Inserts or replaces by id; later duplicates within one call win.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertReport>;
    /// At most `top_k` hits, descending by score, none below `score_threshold`.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: Option<f32>,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<SearchResult>>;
    async fn collection_info(&self) -> Result<CollectionInfo>;
    async fn delete_collection(&self) -> Result<()>;
}

pub trait DocumentSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<LoadReport>;
}
