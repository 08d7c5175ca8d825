//! ragdb-embed
//!
//! Embedding providers behind `ragdb_core::traits::Embedder`.

pub mod hash;
pub mod http;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

use ragdb_core::config::{EmbeddingConfig, EmbeddingProviderKind};
use ragdb_core::error::Result;
use ragdb_core::traits::Embedder;
use tracing::{info, warn};

/// Builds the configured provider. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashing embedder regardless of configuration.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake || config.provider == EmbeddingProviderKind::Hash {
        warn!(dimension = config.dimension, "using hash embeddings; similarity is lexical only");
        return Ok(Box::new(HashEmbedder::new(config.dimension)?));
    }
    info!(model = %config.model, base_url = %config.base_url, "using HTTP embeddings");
    Ok(Box::new(HttpEmbedder::new(config)?))
}
