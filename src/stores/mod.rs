//! Vector storage for embedded chunks.
//!
//! The [`VectorStore`] trait abstracts over storage implementations so the
//! ingestion pipeline and the retriever never depend on a concrete backend.
//! The store owns its own query-time embedding model: ingestion hands it
//! pre-computed embeddings, while [`VectorStore::query`] embeds the query
//! text internally. Supported backends:
//!
//! - [`sqlite::SqliteChunkStore`] - SQLite with vector search via `sqlite-vec`

pub mod sqlite;

use async_trait::async_trait;

use crate::types::RagError;

pub use sqlite::SqliteChunkStore;

/// Deterministic id for chunk `index` of the document `doc_id`.
pub fn chunk_id(doc_id: &str, index: usize) -> String {
    format!("{doc_id}-{index}")
}

/// The id probed by [`VectorStore::document_exists`]: a document's first chunk.
pub(crate) fn dedup_probe_id(doc_id: &str) -> String {
    chunk_id(doc_id, 0)
}

/// Rejects positionally misaligned upsert slices before anything is written.
pub(crate) fn validate_aligned(
    ids: &[String],
    texts: &[String],
    embeddings: &[Vec<f32>],
) -> Result<(), RagError> {
    if ids.len() != texts.len() || ids.len() != embeddings.len() {
        return Err(RagError::Storage(format!(
            "upsert slices must be aligned: {} ids, {} texts, {} embeddings",
            ids.len(),
            texts.len(),
            embeddings.len()
        )));
    }
    Ok(())
}

/// Persistent index of `(id, text, embedding)` triples with similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or wholesale-replaces each triple, keyed by id.
    ///
    /// The three slices are positionally aligned; a length mismatch is
    /// rejected with [`RagError::Storage`] before any write happens.
    async fn upsert(
        &self,
        ids: &[String],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError>;

    /// Returns the `top_k` most similar chunk texts per query text, most
    /// similar first, embedding each query with the store's own model.
    async fn query(
        &self,
        query_texts: &[String],
        top_k: usize,
    ) -> Result<Vec<Vec<String>>, RagError>;

    /// Heuristic ingestion probe: does chunk `"<docId>-0"` exist?
    ///
    /// A document is assumed fully ingested when its first chunk is present,
    /// so a crash between chunk 0 and later chunks goes undetected. Store
    /// errors degrade to `false`, biasing toward re-ingestion rather than
    /// data loss.
    async fn document_exists(&self, doc_id: &str) -> bool;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_doc_id_plus_index() {
        assert_eq!(chunk_id("notes.txt", 0), "notes.txt-0");
        assert_eq!(chunk_id("notes.txt", 12), "notes.txt-12");
        assert_eq!(dedup_probe_id("notes.txt"), "notes.txt-0");
    }

    #[test]
    fn aligned_slices_pass_validation() {
        let ids = vec!["a-0".to_string()];
        let texts = vec!["text".to_string()];
        let embeddings = vec![vec![0.1_f32]];
        assert!(validate_aligned(&ids, &texts, &embeddings).is_ok());
    }

    #[test]
    fn misaligned_slices_are_rejected() {
        let ids = vec!["a-0".to_string(), "a-1".to_string()];
        let texts = vec!["text".to_string()];
        let embeddings = vec![vec![0.1_f32]];
        let err = validate_aligned(&ids, &texts, &embeddings).unwrap_err();
        assert!(matches!(err, RagError::Storage(_)));
    }
}
