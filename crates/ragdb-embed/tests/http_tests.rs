use mockito::Matcher;
use serde_json::json;

use ragdb_core::config::{EmbeddingConfig, EmbeddingProviderKind};
use ragdb_core::traits::Embedder;
use ragdb_core::Error;
use ragdb_embed::HttpEmbedder;

fn config(base_url: String, dimension: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: EmbeddingProviderKind::Http,
        model: "test-model".into(),
        base_url,
        api_key: Some("secret".into()),
        dimension,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn posts_batch_and_orders_by_index() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({"model": "test-model", "input": ["a", "b"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let embedder = HttpEmbedder::new(&config(server.url(), 2)).unwrap();
    let vectors = embedder.embed_batch(&["a".to_string(), "b".to_string()]).await.unwrap();

    mock.assert_async().await;
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn empty_batch_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/v1/embeddings").expect(0).create_async().await;

    let embedder = HttpEmbedder::new(&config(server.url(), 2)).unwrap();
    assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn wrong_dimension_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}).to_string())
        .create_async()
        .await;

    let embedder = HttpEmbedder::new(&config(server.url(), 2)).unwrap();
    let err = embedder.embed("a").await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }), "{err}");
}

#[tokio::test]
async fn server_errors_map_to_embedding_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("POST", "/v1/embeddings").with_status(503).create_async().await;

    let embedder = HttpEmbedder::new(&config(server.url(), 2)).unwrap();
    let err = embedder.embed("a").await.unwrap_err();
    assert!(matches!(err, Error::Embedding(_)), "{err}");
}
