//! Pipeline configuration.
//!
//! Configuration is resolved in order (later wins):
//!
//! 1. A config file (YAML, TOML, or JSON, selected by extension)
//! 2. Environment variables (`RAGMILL_*`), with `.env` loaded via `dotenvy`
//!
//! The embedding API credential is deliberately *not* part of this struct;
//! it is read from `OPENAI_API_KEY` by the components that need it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ingestion::ChunkerConfig;
use crate::types::RagError;

/// Settings for the ingestion and retrieval pipeline.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Vector store collection identifier. One database file per collection.
    pub collection_name: String,
    /// Directory holding the on-disk vector store.
    pub persist_directory: PathBuf,
    /// Flat directory scanned (non-recursively) for documents to ingest.
    pub docs_directory: PathBuf,
    /// Severity threshold for diagnostic output, e.g. `info` or `ragmill=debug`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Chunk size and overlap used when splitting documents.
    #[serde(default)]
    pub chunking: ChunkerConfig,
    /// Embedding model identifier, used for ingestion and query-time embedding.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Chat model identifier used by the response generators.
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    /// Number of chunks retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_top_k() -> usize {
    2
}

impl PipelineConfig {
    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.collection_name.trim().is_empty() {
            return Err(RagError::Config(
                "collection_name must not be empty".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        self.chunking.validate()
    }
}

/// Builder resolving a [`PipelineConfig`] from a file plus env overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base: Option<PipelineConfig>,
    use_env: bool,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the base configuration from a YAML, TOML, or JSON file.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, RagError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            RagError::Config(format!("failed to read {}: {err}", path.display()))
        })?;

        let config: PipelineConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|err| RagError::Config(format!("invalid YAML config: {err}")))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|err| RagError::Config(format!("invalid TOML config: {err}")))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|err| RagError::Config(format!("invalid JSON config: {err}")))?,
            _ => {
                return Err(RagError::Config(format!(
                    "unsupported config format for {}: expected .yaml, .yml, .toml, or .json",
                    path.display()
                )));
            }
        };

        self.base = Some(config);
        Ok(self)
    }

    /// Enables overrides from `RAGMILL_*` environment variables.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Resolves the final configuration and validates it.
    pub fn build(self) -> Result<PipelineConfig, RagError> {
        let Some(mut config) = self.base else {
            return Err(RagError::Config(
                "no configuration source provided".to_string(),
            ));
        };

        if self.use_env {
            dotenvy::dotenv().ok();

            if let Ok(value) = std::env::var("RAGMILL_COLLECTION_NAME") {
                config.collection_name = value;
            }
            if let Ok(value) = std::env::var("RAGMILL_PERSIST_DIRECTORY") {
                config.persist_directory = PathBuf::from(value);
            }
            if let Ok(value) = std::env::var("RAGMILL_DOCS_DIRECTORY") {
                config.docs_directory = PathBuf::from(value);
            }
            if let Ok(value) = std::env::var("RAGMILL_LOG_LEVEL") {
                config.log_level = value;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn yaml_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "config.yaml",
            "collection_name: docs\npersist_directory: ./store\ndocs_directory: ./docs\n",
        );

        let config = ConfigBuilder::new().with_file(&path).unwrap().build().unwrap();
        assert_eq!(config.collection_name, "docs");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 20);
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.top_k, 2);
    }

    #[test]
    fn toml_config_overrides_chunking() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "config.toml",
            "collection_name = \"docs\"\npersist_directory = \"./store\"\ndocs_directory = \"./docs\"\n\n[chunking]\nchunk_size = 500\noverlap = 50\n",
        );

        let config = ConfigBuilder::new().with_file(&path).unwrap().build().unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 50);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "config.ini", "collection_name = docs\n");

        let err = ConfigBuilder::new().with_file(&path).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn invalid_chunking_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "config.yaml",
            "collection_name: docs\npersist_directory: ./store\ndocs_directory: ./docs\nchunking:\n  chunk_size: 100\n  overlap: 100\n",
        );

        let err = ConfigBuilder::new().with_file(&path).unwrap().build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn empty_collection_name_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "config.yaml",
            "collection_name: \"\"\npersist_directory: ./store\ndocs_directory: ./docs\n",
        );

        let err = ConfigBuilder::new().with_file(&path).unwrap().build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn missing_source_is_an_error() {
        let err = ConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }
}
