//! Load → chunk → embed → upsert.
//!
//! Documents are processed concurrently up to `concurrency` at a time. Each
//! document's chunks are embedded together and written in a single upsert,
//! so a document is either fully visible in the index or reported as failed.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use ragdb_core::chunker::TextChunker;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{DocumentSource, Embedder, VectorBackend};
use ragdb_core::types::{records_from_chunks, Document};
use ragdb_vector::VectorStore;

/// A document (or file) that did not make it into the index.
#[derive(Debug)]
pub struct DocumentFailure {
    pub source: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub points: usize,
    pub failures: Vec<DocumentFailure>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool { self.failures.is_empty() }
}

pub struct Ingestor {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    concurrency: usize,
    progress: Option<ProgressBar>,
}

impl Ingestor {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, chunker: TextChunker, concurrency: usize) -> Self {
        Self { store, embedder, chunker, concurrency: concurrency.max(1), progress: None }
    }

    /// Advances `bar` by one per finished document.
    #[must_use]
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Loads `path` through `source` and ingests what loaded. Files the source
    /// skipped are carried into the report's failures.
    pub async fn ingest_path(&self, source: &dyn DocumentSource, path: &Path) -> Result<IngestReport> {
        let loaded = source.load(path)?;
        let mut report = self.ingest(&loaded.documents).await?;
        report.failures.extend(
            loaded
                .failures
                .into_iter()
                .map(|f| DocumentFailure { source: f.path.display().to_string(), error: f.error }),
        );
        Ok(report)
    }

    /// Ingests `documents`. Only a failure to prepare the collection aborts
    /// the run; per-document failures are collected in the report.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        self.store.ensure_collection(self.embedder.dim()).await?;
        if let Some(bar) = &self.progress {
            bar.set_length(documents.len() as u64);
        }

        let outcomes: Vec<(String, Result<(usize, usize)>)> = stream::iter(documents)
            .map(|doc| async move {
                let outcome = self.ingest_document(doc).await;
                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }
                (doc.source().to_string(), outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestReport::default();
        for (source, outcome) in outcomes {
            match outcome {
                Ok((chunks, points)) => {
                    report.documents += 1;
                    report.chunks += chunks;
                    report.points += points;
                }
                Err(error) => {
                    warn!(%source, %error, "document not ingested");
                    report.failures.push(DocumentFailure { source, error });
                }
            }
        }
        info!(
            collection = self.store.collection(),
            documents = report.documents,
            chunks = report.chunks,
            failed = report.failures.len(),
            "ingestion finished"
        );
        Ok(report)
    }

    /// Chunk ids derive from the document source, so re-ingesting a file
    /// replaces its points instead of duplicating them.
    async fn ingest_document(&self, document: &Document) -> Result<(usize, usize)> {
        let chunks = self.chunker.chunk(document, None);
        if chunks.is_empty() {
            debug!(source = document.source(), "document produced no chunks");
            return Ok((0, 0));
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let records = records_from_chunks(&chunks, vectors)?;
        let report = self.store.upsert(records).await?.ensure_complete()?;
        Ok((chunks.len(), report.applied.len()))
    }
}
