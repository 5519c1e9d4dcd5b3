//! Ingestion: turning a directory of documents into stored, embedded chunks.
//!
//! * [`loader`] - reads supported file formats into [`loader::RawDocument`]s.
//! * [`chunker`] - splits text into fixed-size overlapping chunks.
//! * [`pipeline`] - orchestrates load → dedup → chunk → embed → upsert.

pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::{ChunkerConfig, split_text};
pub use loader::{DocumentHandler, DocumentLoader, RawDocument};
pub use pipeline::{IngestionPipeline, IngestionReport};
