//! ```text
//! Docs Directory ──► ingestion::loader ──► RawDocument
//!                                │
//!                                ▼
//!                    ingestion::chunker ──► Chunk ("<docId>-<index>")
//!                                │
//!                                ▼
//!              embedding::EmbeddingProvider ──► EmbeddedChunk
//!                                │
//!                                ▼
//!          stores::SqliteChunkStore (sqlite-vec) ◄── dedup probe ("<docId>-0")
//!                                │
//!                                ▼
//!            retrieval::Retriever ──► ranked chunk texts ──► generation
//! ```
//!
//! Ingestion and retrieval pipeline for retrieval-augmented generation over
//! a directory of local documents. Ingestion embeds chunks through an
//! [`embedding::EmbeddingProvider`]; the vector store owns a separate
//! embedding model for query-time embedding, so retrieval never touches the
//! ingestion-side provider.

pub mod config;
pub mod embedding;
pub mod generation;
pub mod ingestion;
pub mod progress;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use config::{ConfigBuilder, PipelineConfig};
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider, RigEmbeddingProvider};
pub use ingestion::{ChunkerConfig, DocumentLoader, IngestionPipeline, IngestionReport};
pub use retrieval::Retriever;
pub use stores::{SqliteChunkStore, VectorStore};
pub use types::RagError;
