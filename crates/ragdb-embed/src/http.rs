//! Embeddings from an OpenAI-compatible `/v1/embeddings` endpoint
//! (OpenAI, text-embeddings-inference, vLLM, Ollama, ...).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use ragdb_core::config::EmbeddingConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dim: usize,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

pub fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if has_version_suffix(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(Error::Configuration("embedding dimension must be greater than 0".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("embedding client: {e}")))?;
        Ok(Self {
            client,
            endpoint: embeddings_endpoint(&config.base_url),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            dim: config.dimension,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn model_id(&self) -> &str { &self.model }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest { model: &self.model, input: texts });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let mut response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Embedding(e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Embedding(format!("invalid embedding response: {e}")))?;

        if response.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: bad.len() });
        }
        debug!(model = %self.model, count = vectors.len(), "embedded batch");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::embeddings_endpoint;

    #[test]
    fn endpoint_from_host_base_uses_v1_embeddings() {
        assert_eq!(embeddings_endpoint("http://localhost:8080"), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn endpoint_from_v1_base_appends_embeddings_once() {
        assert_eq!(embeddings_endpoint("https://api.openai.com/v1/"), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn endpoint_preserves_explicit_embeddings_url() {
        assert_eq!(embeddings_endpoint("http://tei:80/v1/embeddings"), "http://tei:80/v1/embeddings");
    }
}
