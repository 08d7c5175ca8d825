use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

use crate::pool::l2_normalize;
use crate::tokenize::tokenize;

/// Deterministic bag-of-tokens embedder. Texts sharing tokens land close
/// together, which is enough for tests and offline development.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Configuration("embedding dimension must be greater than 0".into()));
        }
        Ok(Self { dim, id: format!("hash:xxh64:d{dim}") })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in tokenize(text).enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or_default();
            let val = ((h >> 32) as u32 as f32) / (u32::MAX as f32);
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn model_id(&self) -> &str { &self.id }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
