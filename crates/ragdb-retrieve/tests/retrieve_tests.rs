use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ragdb_core::traits::{Embedder, VectorBackend};
use ragdb_core::types::VectorRecord;
use ragdb_core::{Error, Result};
use ragdb_retrieve::{chapter_filter, Retrieval, Retriever, NO_RELEVANT_CONTENT};
use ragdb_vector::VectorStore;

/// Two-dimensional embedder keyed on a few words, counting its calls.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn dim(&self) -> usize { 2 }
    fn model_id(&self) -> &str { "keyword" }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| match t {
                t if t.contains("alpha") => vec![1.0, 0.0],
                t if t.contains("beta") => vec![0.0, 1.0],
                _ => vec![1.0, 1.0],
            })
            .collect())
    }
}

fn point(id: &str, vector: [f32; 2], content: &str, chapter: &str, index: u64) -> VectorRecord {
    let payload = json!({
        "content": content,
        "metadata": {"source": format!("{chapter}.md"), "chunk_index": index, "total_chunks": 3, "chapter": chapter},
        "doc_id": chapter,
        "chunk_index": index,
        "total_chunks": 3,
    });
    VectorRecord::new(id, vector.to_vec(), payload.as_object().cloned().unwrap_or_default())
}

async fn setup() -> (Retriever, Arc<KeywordEmbedder>) {
    let store = Arc::new(VectorStore::in_memory("test"));
    store.ensure_collection(2).await.unwrap();
    store
        .upsert(vec![
            point("a", [1.0, 0.0], "Alpha text.", "chapter-1", 0),
            point("b", [0.0, 1.0], "Beta text.", "chapter-2", 1),
            point("c", [1.0, 1.0], "Mixed text.", "chapter-3", 2),
        ])
        .await
        .unwrap()
        .ensure_complete()
        .unwrap();
    let embedder = Arc::new(KeywordEmbedder::default());
    (Retriever::new(store, embedder.clone()), embedder)
}

#[tokio::test]
async fn assembles_context_and_sources_in_rank_order() {
    let (retriever, _) = setup().await;

    let retrieval = retriever.retrieve("tell me about alpha", 2, 0.5, None).await.unwrap();

    let Retrieval::Relevant(ctx) = retrieval else { panic!("expected results") };
    let ids: Vec<&str> = ctx.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a", "c"]);
    assert_eq!(ctx.context, "Alpha text.\n\nMixed text.");
    assert_eq!(ctx.sources.len(), 2);
    assert_eq!(ctx.sources[0].id, "a");
    assert_eq!(ctx.sources[0].source, "chapter-1.md");
    assert_eq!(ctx.sources[0].chunk_index, 0);
    assert_eq!(ctx.sources[1].chunk_index, 2);
    assert_eq!(ctx.sources[1].total_chunks, 3);
    assert!((ctx.sources[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn json_filter_restricts_candidates() {
    let (retriever, _) = setup().await;
    let filter = json!({"metadata.chapter": {"$in": ["chapter-2"]}});

    let retrieval = retriever.retrieve("alpha", 5, 0.0, Some(&filter)).await.unwrap();

    let ids: Vec<&str> = retrieval.results().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["b"]);
}

#[tokio::test]
async fn chapter_list_builds_membership_filter() {
    let (retriever, _) = setup().await;
    let filter = chapter_filter(&["chapter-3"]);
    assert!(chapter_filter::<&str>(&[]).is_none());

    let retrieval = retriever.retrieve_with("beta", 5, 0.0, filter.as_ref()).await.unwrap();
    assert_eq!(retrieval.results().len(), 1);
    assert_eq!(retrieval.results()[0].id, "c");
}

#[tokio::test]
async fn nothing_above_threshold_is_not_an_error() {
    let (retriever, _) = setup().await;
    let filter = json!({"metadata.chapter": "chapter-2"});

    let retrieval = retriever.retrieve("alpha", 5, 0.5, Some(&filter)).await.unwrap();

    assert_eq!(retrieval, Retrieval::NoRelevantContent);
    assert!(retrieval.results().is_empty());
    assert!(retrieval.context().is_none());
    assert!(!NO_RELEVANT_CONTENT.is_empty());
}

#[tokio::test]
async fn empty_collection_yields_no_relevant_content() {
    let store = Arc::new(VectorStore::in_memory("empty"));
    store.ensure_collection(2).await.unwrap();
    let retriever = Retriever::new(store, Arc::new(KeywordEmbedder::default()));

    let retrieval = retriever.retrieve("alpha", 5, 0.5, None).await.unwrap();
    assert!(!retrieval.is_relevant());
}

#[tokio::test]
async fn blank_query_is_rejected_before_embedding() {
    let (retriever, embedder) = setup().await;

    for query in ["", "   \n"] {
        let err = retriever.retrieve(query, 5, 0.5, None).await.unwrap_err();
        assert!(matches!(err, Error::EmptyQuery));
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsupported_filter_is_a_configuration_error() {
    let (retriever, embedder) = setup().await;
    let filter = json!({"$or": [{"chapter": "chapter-1"}, {"chapter": "chapter-2"}]});

    let err = retriever.retrieve("alpha", 5, 0.5, Some(&filter)).await.unwrap_err();

    assert!(matches!(err, Error::Configuration(_)), "{err}");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}
