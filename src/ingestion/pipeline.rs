//! Ingestion orchestration: load → dedup → chunk → embed → upsert.

use std::sync::Arc;

use tracing::{debug, info};

use super::chunker::{ChunkerConfig, split_text};
use super::loader::DocumentLoader;
use crate::embedding::EmbeddingProvider;
use crate::stores::{VectorStore, chunk_id};
use crate::types::RagError;

/// A chunk with its deterministic id, before embedding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
}

/// A chunk ready for persistence; never mutated after the upsert.
#[derive(Clone, Debug)]
pub struct EmbeddedChunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Outcome of one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// Documents found in the source directory.
    pub documents_loaded: usize,
    /// Documents skipped because their dedup probe passed.
    pub documents_skipped: usize,
    /// Newly stored chunks; zero when every document was already ingested.
    pub chunks_stored: usize,
}

/// Coordinates the full ingestion sequence against a vector store.
///
/// Re-running ingestion over an unchanged document set performs zero
/// embedding calls and zero store writes: documents whose first chunk is
/// already stored are filtered out before chunking.
pub struct IngestionPipeline {
    loader: DocumentLoader,
    chunker: ChunkerConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    pub fn new(
        loader: DocumentLoader,
        chunker: ChunkerConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            store,
        }
    }

    /// Runs one ingestion pass and reports how much new content was stored.
    pub async fn ingest(&self) -> Result<IngestionReport, RagError> {
        let documents = self.loader.load_documents().await?;
        let documents_loaded = documents.len();

        let mut fresh = Vec::new();
        for document in documents {
            if self.store.document_exists(&document.id).await {
                debug!(document = %document.id, "already ingested, skipping");
            } else {
                fresh.push(document);
            }
        }
        let documents_skipped = documents_loaded - fresh.len();

        if fresh.is_empty() {
            info!(documents_loaded, "no new documents to ingest");
            return Ok(IngestionReport {
                documents_loaded,
                documents_skipped,
                chunks_stored: 0,
            });
        }

        let mut chunks = Vec::new();
        for document in &fresh {
            for (index, text) in split_text(&document.text, &self.chunker)?
                .into_iter()
                .enumerate()
            {
                chunks.push(Chunk {
                    id: chunk_id(&document.id, index),
                    text,
                });
            }
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk {
                id: chunk.id,
                text: chunk.text,
                embedding,
            })
            .collect();

        let ids: Vec<String> = embedded.iter().map(|chunk| chunk.id.clone()).collect();
        let contents: Vec<String> = embedded.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors: Vec<Vec<f32>> = embedded.into_iter().map(|chunk| chunk.embedding).collect();
        self.store.upsert(&ids, &contents, &vectors).await?;

        info!(
            documents = documents_loaded - documents_skipped,
            chunks = ids.len(),
            "ingestion complete"
        );
        Ok(IngestionReport {
            documents_loaded,
            documents_skipped,
            chunks_stored: ids.len(),
        })
    }
}
