//! Qdrant engine over the REST API.
//!
//! Qdrant point ids must be unsigned integers or UUIDs, so every record id is
//! mapped to a UUID derived from its blake3 hash. The original id travels in
//! the reserved payload key [`RECORD_ID_KEY`] and is removed again before
//! results leave this module.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use ragdb_core::config::StoreConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::filter::FilterSpec;
use ragdb_core::traits::VectorBackend;
use ragdb_core::types::{
    CollectionInfo, CollectionStatus, Distance, FailedRecord, Payload, SearchResult, UpsertReport, VectorRecord,
};

use crate::filter::translate;
use crate::rank;

pub const RECORD_ID_KEY: &str = "_record_id";

/// Extra hits requested beyond `top_k` so equal scores at the cutoff are
/// ranked by id here rather than chosen by the server.
pub const SEARCH_TIE_SLACK: usize = 8;

/// Deterministic Qdrant point id for a record id.
pub fn point_id(record_id: &str) -> Uuid {
    let hash = blake3::hash(record_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    Uuid::from_bytes(bytes)
}

fn distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Deserialize)]
struct CollectionDescription {
    status: CollectionStatus,
    #[serde(default)]
    vectors_count: Option<u64>,
    #[serde(default)]
    points_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct VectorParams {
    size: usize,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

pub struct QdrantBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    /// Vector size of the collection once known; used to reject bad vectors
    /// before they reach the server.
    dimension: RwLock<Option<usize>>,
}

impl QdrantBackend {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("qdrant client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            collection: config.collection.clone(),
            dimension: RwLock::new(None),
        })
    }

    pub fn url(&self) -> &str { &self.base_url }

    /// Lists collections; any failure means the server is not usable.
    pub async fn probe(&self) -> Result<()> {
        self.list_collections()
            .await
            .map(|_| ())
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", self.base_url)))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    fn collection_path(&self) -> String { format!("/collections/{}", self.collection) }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", self.base_url)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("collection '{}'", self.collection)));
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Operation(format!("qdrant returned {status}: {body}")))
    }

    async fn search_page(&self, body: &Value) -> Result<Vec<SearchResult>> {
        let path = format!("{}/points/search", self.collection_path());
        let response = self.send(self.request(Method::POST, &path).json(body)).await?;
        let points: Vec<ScoredPoint> = Self::read(response).await?;
        Ok(points
            .into_iter()
            .map(|point| {
                let mut payload = point.payload.unwrap_or_default();
                let id = match payload.remove(RECORD_ID_KEY) {
                    Some(Value::String(id)) => id,
                    _ => match point.id {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                };
                SearchResult { id, score: point.score, payload }
            })
            .collect())
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json::<Envelope<T>>()
            .await
            .map(|envelope| envelope.result)
            .map_err(|e| Error::Operation(format!("unexpected qdrant response: {e}")))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.send(self.request(Method::GET, "/collections")).await?;
        let list: CollectionList = Self::read(response).await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    async fn describe(&self) -> Result<CollectionDescription> {
        let response = self.send(self.request(Method::GET, &self.collection_path())).await?;
        let description: CollectionDescription = Self::read(response).await?;
        *self.dimension.write() = Some(description.config.params.vectors.size);
        Ok(description)
    }

    async fn known_dimension(&self) -> Result<usize> {
        if let Some(dimension) = *self.dimension.read() {
            return Ok(dimension);
        }
        Ok(self.describe().await?.config.params.vectors.size)
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    async fn create_collection(&self, dimension: usize, distance: Distance) -> Result<()> {
        if dimension == 0 {
            return Err(Error::Configuration("collection dimension must be greater than 0".into()));
        }
        if self.list_collections().await?.iter().any(|name| name == &self.collection) {
            let existing = self.known_dimension().await?;
            debug!(collection = %self.collection, dimension = existing, "collection already exists");
            return Ok(());
        }
        let body = json!({ "vectors": { "size": dimension, "distance": distance_name(distance) } });
        self.send(self.request(Method::PUT, &self.collection_path()).json(&body)).await?;
        *self.dimension.write() = Some(dimension);
        info!(collection = %self.collection, dimension, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertReport> {
        let mut report = UpsertReport::default();
        if records.is_empty() {
            return Ok(report);
        }
        let dimension = self.known_dimension().await?;
        let mut points = Vec::with_capacity(records.len());
        let mut ids = Vec::with_capacity(records.len());
        for record in rank::dedupe_last_wins(records) {
            if record.vector.len() != dimension {
                let error = Error::DimensionMismatch { expected: dimension, actual: record.vector.len() };
                report.failed.push(FailedRecord { id: record.id, error });
                continue;
            }
            let mut payload = record.payload;
            payload.insert(RECORD_ID_KEY.to_string(), Value::String(record.id.clone()));
            points.push(json!({
                "id": point_id(&record.id).to_string(),
                "vector": record.vector,
                "payload": payload,
            }));
            ids.push(record.id);
        }
        if !points.is_empty() {
            let path = format!("{}/points?wait=true", self.collection_path());
            self.send(self.request(Method::PUT, &path).json(&json!({ "points": points }))).await?;
        }
        debug!(collection = %self.collection, applied = ids.len(), failed = report.failed.len(), "upserted points");
        report.applied = ids;
        Ok(report)
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: Option<f32>,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<SearchResult>> {
        let dimension = self.known_dimension().await?;
        if vector.len() != dimension {
            return Err(Error::DimensionMismatch { expected: dimension, actual: vector.len() });
        }
        if top_k == 0 {
            return Ok(vec![]);
        }
        let mut body = json!({ "vector": vector, "with_payload": true });
        if let Some(threshold) = score_threshold {
            body["score_threshold"] = json!(threshold);
        }
        if let Some(spec) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = translate(spec);
        }

        let mut limit = top_k.saturating_add(SEARCH_TIE_SLACK);
        loop {
            body["limit"] = json!(limit);
            let mut hits = self.search_page(&body).await?;
            rank::sort_results(&mut hits);
            if !rank::tie_spills_past_page(&hits, top_k, limit) {
                return Ok(rank::finish(hits, top_k, score_threshold));
            }
            debug!(collection = %self.collection, limit, "equal scores at the cutoff fill the page, widening");
            limit = limit.saturating_mul(2);
        }
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let description = self.describe().await?;
        let point_count = description.points_count.unwrap_or_default();
        Ok(CollectionInfo {
            name: self.collection.clone(),
            vector_count: description.vectors_count.unwrap_or(point_count),
            point_count,
            status: description.status,
        })
    }

    async fn delete_collection(&self) -> Result<()> {
        match self.send(self.request(Method::DELETE, &self.collection_path())).await {
            Ok(_) | Err(Error::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        *self.dimension.write() = None;
        info!(collection = %self.collection, "deleted qdrant collection");
        Ok(())
    }
}
