//! Query-time retrieval of relevant chunks.

use std::sync::Arc;

use tracing::info;

use crate::stores::VectorStore;
use crate::types::RagError;

/// Fetches the chunks most relevant to a free-text query.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Returns up to `top_k` chunk texts, most relevant first.
    ///
    /// Issues a single-element query batch and flattens the per-query
    /// sublists in declared order. Store errors propagate unchanged.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, RagError> {
        let results = self.store.query(&[query.to_string()], top_k).await?;
        let chunks: Vec<String> = results.into_iter().flatten().collect();
        info!(count = chunks.len(), "retrieved chunks for query");
        Ok(chunks)
    }
}
