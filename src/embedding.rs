//! Embedding providers for the ingestion side of the pipeline.
//!
//! Ingestion embeds chunk text through the [`EmbeddingProvider`] capability
//! trait; the vector store embeds query text with its own model (see
//! [`crate::stores`]). Providers do not retry: a failure aborts the batch
//! and propagates to the caller.

use async_trait::async_trait;
use parking_lot::Mutex;
use rig::client::EmbeddingsClient;
use rig::embeddings::embedding::{Embedding, EmbeddingError, EmbeddingModel};
use rig::providers::openai;
use tracing::debug;

use crate::types::RagError;

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embeds a batch of texts, one provider call per text.
    ///
    /// The first failure aborts the batch; there are no partial results.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        debug!(provider = self.name(), count = texts.len(), "generated embeddings");
        Ok(embeddings)
    }
}

/// Adapter exposing any rig [`EmbeddingModel`] as an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct RigEmbeddingProvider<M>
where
    M: EmbeddingModel,
{
    model: M,
    name: String,
}

impl<M> RigEmbeddingProvider<M>
where
    M: EmbeddingModel,
{
    pub fn new(model: M, name: impl Into<String>) -> Self {
        Self {
            model,
            name: name.into(),
        }
    }
}

impl RigEmbeddingProvider<openai::EmbeddingModel> {
    /// Builds a provider over the OpenAI embedding API.
    ///
    /// The credential comes from the `OPENAI_API_KEY` environment variable,
    /// never from configuration files.
    pub fn openai(model_name: &str) -> Result<Self, RagError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let client = openai::Client::new(&api_key)
            .map_err(|err| RagError::Config(err.to_string()))?;
        Ok(Self::new(
            client.embedding_model(model_name),
            format!("openai:{model_name}"),
        ))
    }
}

#[async_trait]
impl<M> EmbeddingProvider for RigEmbeddingProvider<M>
where
    M: EmbeddingModel + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut embeddings = self
            .model
            .embed_texts(vec![text.to_string()])
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        let Some(embedding) = embeddings.pop() else {
            return Err(RagError::Embedding(
                "provider returned no embedding".to_string(),
            ));
        };
        Ok(embedding.vec.into_iter().map(|value| value as f32).collect())
    }
}

/// Deterministic hash-derived embedding, shared by the test doubles.
pub fn hash_embedding(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i as u32 % 64) * 7) ^ ((i as u64) << 17);
            ((bits >> 32) as f32) / (u32::MAX as f32)
        })
        .collect()
}

/// Test double producing deterministic vectors and recording every call.
pub struct MockEmbeddingProvider {
    dims: usize,
    calls: Mutex<Vec<String>>,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::with_dims(8)
    }

    pub fn with_dims(dims: usize) -> Self {
        Self {
            dims,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of `embed` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Every text embedded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.calls.lock().push(text.to_string());
        Ok(hash_embedding(text, self.dims))
    }
}

/// Deterministic rig [`EmbeddingModel`] for tests and offline runs.
///
/// Uses the same hash scheme as [`MockEmbeddingProvider`], so a store opened
/// with this model ranks identical text as an exact match.
#[derive(Clone, Debug)]
pub struct DeterministicEmbeddingModel {
    dims: usize,
}

impl DeterministicEmbeddingModel {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl EmbeddingModel for DeterministicEmbeddingModel {
    const MAX_DOCUMENTS: usize = 64;

    type Client = ();

    fn make(_client: &Self::Client, _model: impl Into<String>, dims: Option<usize>) -> Self {
        Self {
            dims: dims.unwrap_or(0),
        }
    }

    fn ndims(&self) -> usize {
        self.dims
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let dims = self.dims;
        let documents: Vec<String> = texts.into_iter().collect();
        async move {
            Ok(documents
                .into_iter()
                .map(|document| Embedding {
                    vec: hash_embedding(&document, dims)
                        .into_iter()
                        .map(f64::from)
                        .collect(),
                    document,
                })
                .collect())
        }
    }
}
