//! Configuration loader and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_STORE__URL`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::chunker::ChunkingConfig;
use crate::error::Error;

const PLACEHOLDER_URL_MARKERS: [&str; 1] = ["your-cluster-url"];
const PLACEHOLDER_KEY_MARKERS: [&str; 1] = ["your-actual-api-key"];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The typed view of the whole configuration, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.chunking.validate()?;
        settings.store.validate()?;
        if settings.embedding.dimension != settings.store.vector_size {
            anyhow::bail!(
                "embedding.dimension ({}) must equal store.vector_size ({})",
                settings.embedding.dimension,
                settings.store.vector_size
            );
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

/// Which engine the vector store should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Networked engine, falling back to memory when unusable.
    #[default]
    Auto,
    Memory,
    /// Networked engine only; construction fails if it is unusable.
    Qdrant,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "memory" => Ok(Self::Memory),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(format!("unknown backend '{other}' (expected auto, memory or qdrant)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_size: usize,
    pub timeout_secs: u64,
    pub backend: BackendPreference,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "documents".to_string(),
            vector_size: 384,
            timeout_secs: 10,
            backend: BackendPreference::Auto,
        }
    }
}

impl StoreConfig {
    /// The collection name becomes a URL path segment, so it is limited to
    /// ASCII letters, digits, `-`, `_` and `.`.
    pub fn validate(&self) -> crate::error::Result<()> {
        let name = self.collection.as_str();
        if name.is_empty() {
            return Err(Error::Configuration("store.collection must not be empty".into()));
        }
        if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))) {
            return Err(Error::Configuration(format!("store.collection '{name}' contains '{bad}'")));
        }
        if name == "." || name == ".." {
            return Err(Error::Configuration(format!("store.collection '{name}' is not a valid name")));
        }
        Ok(())
    }

    /// True when the URL or API key is still a template sentinel.
    pub fn is_placeholder(&self) -> bool {
        let url = self.url.to_ascii_lowercase();
        if url.trim().is_empty() || PLACEHOLDER_URL_MARKERS.iter().any(|m| url.contains(m)) {
            return true;
        }
        self.api_key
            .as_deref()
            .is_some_and(|key| PLACEHOLDER_KEY_MARKERS.iter().any(|m| key.contains(m)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self { Self { top_k: 5, score_threshold: 0.5 } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Hash,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hash,
            model: "all-MiniLM-L6-v2".to_string(),
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            dimension: 384,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub docs_dir: String,
    pub concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self { Self { docs_dir: "./docs".to_string(), concurrency: 4 } }
}

/// Default level plus per-module overrides, e.g. `{ ragdb_vector = "debug" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub default: String,
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { default: "info".to_string(), modules: BTreeMap::new() } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(toml: &str) -> Config {
        Config::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
    }

    #[test]
    fn defaults_apply_without_files() {
        let settings = config_from("").settings().unwrap();
        assert_eq!(settings.chunking.chunk_size, 512);
        assert_eq!(settings.chunking.overlap, 50);
        assert_eq!(settings.store.collection, "documents");
        assert_eq!(settings.store.backend, BackendPreference::Auto);
        assert_eq!(settings.retrieval.top_k, 5);
    }

    #[test]
    fn toml_overrides_nested_keys() {
        let config = config_from("[store]\nbackend = \"memory\"\nvector_size = 2\n[embedding]\ndimension = 2\n[retrieval]\nscore_threshold = 0.25\n");
        let settings = config.settings().unwrap();
        assert_eq!(settings.store.backend, BackendPreference::Memory);
        assert_eq!(settings.store.vector_size, 2);
        assert!((settings.retrieval.score_threshold - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.get::<usize>("store.vector_size").unwrap(), 2);
    }

    #[test]
    fn invalid_chunking_is_rejected() {
        let err = config_from("[chunking]\nchunk_size = 10\noverlap = 10\n").settings().unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn embedding_dimension_must_match_collection() {
        let err = config_from("[embedding]\ndimension = 768\n").settings().unwrap_err();
        assert!(err.to_string().contains("vector_size"));
    }

    #[test]
    fn backend_parses_from_cli_strings() {
        assert_eq!("Memory".parse::<BackendPreference>(), Ok(BackendPreference::Memory));
        assert!("lance".parse::<BackendPreference>().is_err());
    }

    #[test]
    fn collection_name_must_be_a_plain_path_segment() {
        for name in ["docs", "physical-ai_v2", "book.2024"] {
            let store = StoreConfig { collection: name.into(), ..StoreConfig::default() };
            assert!(store.validate().is_ok(), "{name}");
        }
        for name in ["", "a/b", "docs?wait=true", "my docs", "..", "caf\u{e9}"] {
            let store = StoreConfig { collection: name.into(), ..StoreConfig::default() };
            assert!(matches!(store.validate(), Err(Error::Configuration(_))), "{name:?}");
        }
        let err = config_from("[store]\ncollection = \"a/b\"\n").settings().unwrap_err();
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn placeholder_credentials_are_detected() {
        let mut store = StoreConfig::default();
        assert!(!store.is_placeholder());
        store.url = "https://your-cluster-url.cloud.qdrant.io".into();
        assert!(store.is_placeholder());
        store.url = "https://abc.cloud.qdrant.io".into();
        store.api_key = Some("your-actual-api-key".into());
        assert!(store.is_placeholder());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/ragdb");
        assert_eq!(resolve_with_base(base, "docs"), PathBuf::from("/srv/ragdb/docs"));
        assert_eq!(resolve_with_base(base, "/abs/docs"), PathBuf::from("/abs/docs"));
    }
}
