use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::Hasher;
use tracing::{debug, info};
use twox_hash::XxHash64;

use crate::error::{Error, Result};
use crate::types::{Document, TextChunk};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated from the tail of the previous chunk.
    pub overlap: usize,
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 512, overlap: 50, separator: "\n\n".to_string() }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be greater than 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.separator.is_empty() {
            return Err(Error::Configuration("separator must not be empty".into()));
        }
        Ok(())
    }
}

/// Splits documents into overlapping, character-bounded chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Chunks one document. Without `doc_id`, chunk ids derive from a stable
    /// hash of the document's `source`.
    pub fn chunk(&self, document: &Document, doc_id: Option<&str>) -> Vec<TextChunk> {
        let content = document.content.as_str();
        let source = document.source();

        let pieces = if content.contains(self.config.separator.as_str()) {
            self.assemble(content.split(self.config.separator.as_str()))
        } else {
            self.split_by_length(content)
        };
        let pieces: Vec<&str> = pieces.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();

        let total_chunks = pieces.len();
        let source_hash = stable_source_hash(source);
        let chunks: Vec<TextChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let id = match doc_id {
                    Some(d) => format!("{d}_{chunk_index}"),
                    None => format!("{source_hash:016x}_{chunk_index}"),
                };
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".into(), Value::from(chunk_index));
                metadata.insert("total_chunks".into(), Value::from(total_chunks));
                metadata.insert("doc_id".into(), Value::String(doc_id.unwrap_or(source).to_string()));
                metadata.insert("chunk_source".into(), Value::String(format!("{source}_chunk_{chunk_index}")));
                TextChunk { id, content: text.to_string(), metadata, chunk_index, total_chunks }
            })
            .collect();

        debug!(source, chunks = chunks.len(), "chunked document");
        chunks
    }

    /// Chunks every document, assigning `doc_<index>` ids in input order.
    pub fn chunk_many(&self, documents: &[Document]) -> Vec<TextChunk> {
        let all: Vec<TextChunk> = documents
            .iter()
            .enumerate()
            .flat_map(|(idx, doc)| self.chunk(doc, Some(&format!("doc_{idx}"))))
            .collect();
        info!(documents = documents.len(), chunks = all.len(), "chunked documents");
        all
    }

    /// Packs separator-delimited parts into chunks. When the next part would
    /// push the buffer past `chunk_size`, the buffer is closed and the next one
    /// starts with the last `overlap` characters of it followed by the part.
    fn assemble<'a>(&self, parts: impl Iterator<Item = &'a str>) -> Vec<String> {
        let sep = self.config.separator.as_str();
        let sep_len = sep.chars().count();
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for part in parts {
            let part_len = part.chars().count();
            if current.is_empty() {
                current.push_str(part);
                current_len = part_len;
                continue;
            }
            if current_len + sep_len + part_len > self.config.chunk_size {
                let seed = tail_chars(&current, self.config.overlap).to_string();
                chunks.push(std::mem::take(&mut current));
                current_len = seed.chars().count() + part_len;
                current.push_str(&seed);
                current.push_str(part);
            } else {
                current.push_str(sep);
                current.push_str(part);
                current_len += sep_len + part_len;
            }
        }
        if !current.trim().is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Fixed windows of `chunk_size` characters advancing by `chunk_size - overlap`.
    fn split_by_length(&self, text: &str) -> Vec<String> {
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let len = bounds.len() - 1;
        let size = self.config.chunk_size;
        if len <= size {
            return vec![text.to_string()];
        }

        let step = size - self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = start + size;
            if end >= len {
                chunks.push(text[bounds[start]..].to_string());
                break;
            }
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            start += step;
        }
        chunks
    }
}

/// The last `n` characters of `s` (all of it when shorter).
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// XxHash64 (seed 0) of the source string; stable across processes and platforms.
pub fn stable_source_hash(source: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(source.as_bytes());
    hasher.finish()
}
