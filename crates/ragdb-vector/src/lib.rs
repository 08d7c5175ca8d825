//! ragdb-vector
//!
//! The vector store: one contract (`VectorBackend`), two engines.
//! [`QdrantBackend`] talks to a Qdrant server over REST; [`MemoryBackend`]
//! is a brute-force cosine engine used as the fallback and as the reference
//! implementation in tests. [`VectorStore`] picks one at construction.

pub mod filter;
pub mod memory;
pub mod qdrant;
mod rank;
pub mod similarity;
pub mod store;

pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;
pub use store::{BackendKind, VectorStore};
