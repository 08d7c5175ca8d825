use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use ragdb_core::error::{Error, Result};
use ragdb_core::filter::FilterSpec;
use ragdb_core::traits::{Embedder, VectorBackend};
use ragdb_core::types::{SearchResult, UNKNOWN_SOURCE};
use ragdb_vector::VectorStore;

/// Shown to users when nothing clears the score threshold.
pub const NO_RELEVANT_CONTENT: &str = "I couldn't find any relevant information in the indexed documents to answer your question. Could you try rephrasing or ask about a different topic?";

/// Citation data for one hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub id: String,
    pub score: f32,
    pub source: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
}

impl SourceRef {
    fn from_result(result: &SearchResult) -> Self {
        let metadata = result.metadata();
        let field = |key: &str| metadata.and_then(|m| m.get(key));
        Self {
            id: result.id.clone(),
            score: result.score,
            source: field("source").and_then(Value::as_str).unwrap_or(UNKNOWN_SOURCE).to_string(),
            chunk_index: field("chunk_index").and_then(Value::as_u64).unwrap_or(0),
            total_chunks: field("total_chunks").and_then(Value::as_u64).unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub results: Vec<SearchResult>,
    /// Result contents in rank order, separated by a blank line.
    pub context: String,
    /// Parallel to `results`.
    pub sources: Vec<SourceRef>,
}

/// Outcome of a retrieval. An empty result set is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Relevant(RetrievedContext),
    NoRelevantContent,
}

impl Retrieval {
    pub fn is_relevant(&self) -> bool { matches!(self, Self::Relevant(_)) }

    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Relevant(ctx) => &ctx.results,
            Self::NoRelevantContent => &[],
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Relevant(ctx) => Some(&ctx.context),
            Self::NoRelevantContent => None,
        }
    }
}

/// Payload key of the document's chapter; document metadata lives under `metadata`.
pub const CHAPTER_KEY: &str = "metadata.chapter";

/// `{"metadata.chapter": {"$in": [...]}}`, or no filter for an empty list.
pub fn chapter_filter<S: AsRef<str>>(chapters: &[S]) -> Option<FilterSpec> {
    if chapters.is_empty() {
        return None;
    }
    Some(FilterSpec::new().any_of(CHAPTER_KEY, chapters.iter().map(|c| c.as_ref().to_string())))
}

pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self { Self { store, embedder } }

    /// Retrieves with a filter in its JSON form; see [`FilterSpec::from_json`].
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
        filter: Option<&Value>,
    ) -> Result<Retrieval> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let filter = filter.map(FilterSpec::from_json).transpose()?;
        self.retrieve_with(query, top_k, score_threshold, filter.as_ref()).await
    }

    pub async fn retrieve_with(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
        filter: Option<&FilterSpec>,
    ) -> Result<Retrieval> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let vector = self.embedder.embed(query).await?;
        let results = self.store.search(&vector, top_k, Some(score_threshold), filter).await?;
        debug!(top_k, score_threshold, hits = results.len(), "retrieved");
        if results.is_empty() {
            info!("no results above the score threshold");
            return Ok(Retrieval::NoRelevantContent);
        }

        let context = results.iter().map(SearchResult::content).collect::<Vec<_>>().join("\n\n");
        let sources = results.iter().map(SourceRef::from_result).collect();
        Ok(Retrieval::Relevant(RetrievedContext { results, context, sources }))
    }
}
