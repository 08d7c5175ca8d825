//! Backend parity against a real Qdrant server.
//!
//! Skipped unless `RAGDB_TEST_QDRANT_URL` is set, e.g.
//! `RAGDB_TEST_QDRANT_URL=http://localhost:6333 cargo test -p ragdb-vector --test live_qdrant_tests`

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use ragdb_core::config::StoreConfig;
use ragdb_core::traits::VectorBackend;
use ragdb_core::types::{Distance, VectorRecord};
use ragdb_core::FilterSpec;
use ragdb_vector::{MemoryBackend, QdrantBackend};

fn records() -> Vec<VectorRecord> {
    (0..12)
        .map(|i| {
            let x = i as f32;
            let vector = vec![1.0 + x, 0.5 * x, (x * 0.7).sin(), 1.0 / (1.0 + x)];
            let chapter = format!("chapter-{}", i % 3);
            let payload = json!({"content": format!("chunk {i}"), "metadata": {"chapter": chapter}, "chunk_index": i});
            VectorRecord::new(format!("rec_{i}"), vector, payload.as_object().cloned().unwrap_or_default())
        })
        .collect()
}

#[tokio::test]
async fn qdrant_and_memory_agree() {
    let Ok(url) = std::env::var("RAGDB_TEST_QDRANT_URL") else {
        eprintln!("RAGDB_TEST_QDRANT_URL not set; skipping live Qdrant parity test");
        return;
    };
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let config = StoreConfig {
        url,
        api_key: std::env::var("RAGDB_TEST_QDRANT_API_KEY").ok(),
        collection: format!("ragdb_parity_{nanos}"),
        ..StoreConfig::default()
    };

    let remote = QdrantBackend::new(&config).unwrap();
    remote.probe().await.unwrap();
    let local = MemoryBackend::new(&config.collection);
    for backend in [&remote as &dyn VectorBackend, &local] {
        backend.create_collection(4, Distance::Cosine).await.unwrap();
        backend.create_collection(4, Distance::Cosine).await.unwrap();
        backend.upsert(records()).await.unwrap().ensure_complete().unwrap();
        backend.upsert(records()).await.unwrap().ensure_complete().unwrap();
    }
    assert_eq!(remote.collection_info().await.unwrap().point_count, 12);

    let queries = [vec![1.0, 0.0, 0.0, 0.0], vec![0.2, 1.0, -0.3, 0.1], vec![0.0, 0.0, 1.0, 1.0]];
    let filter = FilterSpec::new().any_of("metadata.chapter", ["chapter-1", "chapter-2"]);
    for query in &queries {
        for f in [None, Some(&filter)] {
            let expected = local.search(query, 12, None, f).await.unwrap();
            let actual = remote.search(query, 12, None, f).await.unwrap();
            let ids = |r: &[ragdb_core::SearchResult]| r.iter().map(|h| h.id.clone()).collect::<Vec<_>>();
            assert_eq!(ids(&actual), ids(&expected), "query {query:?} filter {f:?}");
            for (a, e) in actual.iter().zip(&expected) {
                assert!((a.score - e.score).abs() < 1e-4, "{} vs {}", a.score, e.score);
                assert_eq!(a.payload, e.payload);
            }
        }
    }

    remote.delete_collection().await.unwrap();
}
