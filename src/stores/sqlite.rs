//! SQLite vector store backed by the `sqlite-vec` extension.
//!
//! Each collection lives in its own database file under the persist
//! directory: a `chunks` table holds `(id, content)` rows and a
//! `chunk_embeddings` vec0 virtual table holds the vectors, joined by rowid.
//! Similarity search uses `vec_distance_cosine`. The store survives process
//! restarts; concurrent access from multiple processes is out of scope.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use rig::embeddings::EmbeddingModel;
use tokio_rusqlite::{Connection, OptionalExtension, ffi};
use tracing::{debug, error, info};

use super::{VectorStore, dedup_probe_id, validate_aligned};
use crate::types::RagError;

/// Durable chunk store with query-time embedding via its own model.
#[derive(Clone)]
pub struct SqliteChunkStore<E>
where
    E: EmbeddingModel + 'static,
{
    conn: Connection,
    model: E,
    collection: String,
    dims: usize,
}

impl<E> SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the collection database under `persist_directory`.
    ///
    /// Registers the `sqlite-vec` extension process-wide on first use and
    /// verifies it with `vec_version()`. The vec0 table is dimensioned from
    /// `model.ndims()`.
    pub async fn open(
        persist_directory: impl AsRef<Path>,
        collection: &str,
        model: E,
    ) -> Result<Self, RagError> {
        if collection.trim().is_empty() {
            return Err(RagError::Config(
                "collection name must not be empty".to_string(),
            ));
        }
        let dims = model.ndims();
        if dims == 0 {
            return Err(RagError::Config(
                "embedding model reports zero dimensions".to_string(),
            ));
        }

        register_sqlite_vec()?;

        let directory = persist_directory.as_ref();
        tokio::fs::create_dir_all(directory).await?;
        let db_path = directory.join(format!("{collection}.sqlite3"));

        let conn = Connection::open(db_path.clone())
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Error(err)),
            }
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(move |conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS chunks (id TEXT PRIMARY KEY, content TEXT NOT NULL)",
                [],
            )?;
            conn.execute(
                &format!(
                    "CREATE VIRTUAL TABLE IF NOT EXISTS chunk_embeddings USING vec0(embedding float[{dims}])"
                ),
                [],
            )?;
            Ok::<_, tokio_rusqlite::rusqlite::Error>(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        info!(
            collection = %collection,
            path = %db_path.display(),
            dims,
            "opened vector store"
        );
        Ok(Self {
            conn,
            model,
            collection: collection.to_string(),
            dims,
        })
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut embeddings = self
            .model
            .embed_texts(vec![text.to_string()])
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        let Some(embedding) = embeddings.pop() else {
            return Err(RagError::Embedding(
                "store embedding model returned no embedding".to_string(),
            ));
        };
        Ok(embedding.vec.into_iter().map(|value| value as f32).collect())
    }

    async fn chunk_exists(&self, id: String) -> Result<bool, RagError> {
        self.conn
            .call(move |conn| {
                let found = conn
                    .query_row("SELECT 1 FROM chunks WHERE id = ?1", [id.as_str()], |_| {
                        Ok(())
                    })
                    .optional()?;
                Ok::<_, tokio_rusqlite::rusqlite::Error>(found.is_some())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

#[async_trait]
impl<E> VectorStore for SqliteChunkStore<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn upsert(
        &self,
        ids: &[String],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        validate_aligned(ids, texts, embeddings)?;
        for (id, embedding) in ids.iter().zip(embeddings) {
            if embedding.len() != self.dims {
                return Err(RagError::Storage(format!(
                    "embedding for {id} has {} dimensions, store expects {}",
                    embedding.len(),
                    self.dims
                )));
            }
        }
        if ids.is_empty() {
            return Ok(());
        }

        let rows: Vec<(String, String, String)> = ids
            .iter()
            .zip(texts)
            .zip(embeddings)
            .map(|((id, text), embedding)| {
                let embedding_json = serde_json::to_string(embedding)
                    .map_err(|err| RagError::Storage(err.to_string()))?;
                Ok((id.clone(), text.clone(), embedding_json))
            })
            .collect::<Result<_, RagError>>()?;
        let count = rows.len();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for (id, content, embedding_json) in &rows {
                    tx.execute(
                        "INSERT INTO chunks (id, content) VALUES (?1, ?2) \
                         ON CONFLICT(id) DO UPDATE SET content = excluded.content",
                        (id.as_str(), content.as_str()),
                    )?;
                    let rowid: i64 = tx.query_row(
                        "SELECT rowid FROM chunks WHERE id = ?1",
                        [id.as_str()],
                        |row| row.get(0),
                    )?;
                    tx.execute("DELETE FROM chunk_embeddings WHERE rowid = ?1", [rowid])?;
                    tx.execute(
                        "INSERT INTO chunk_embeddings (rowid, embedding) VALUES (?1, ?2)",
                        (rowid, embedding_json.as_str()),
                    )?;
                }
                tx.commit()?;
                Ok::<_, tokio_rusqlite::rusqlite::Error>(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        info!(chunks = count, collection = %self.collection, "upserted chunks");
        Ok(())
    }

    async fn query(
        &self,
        query_texts: &[String],
        top_k: usize,
    ) -> Result<Vec<Vec<String>>, RagError> {
        let mut results = Vec::with_capacity(query_texts.len());
        for query_text in query_texts {
            let vector = self.embed_query(query_text).await?;
            let embedding_json =
                serde_json::to_string(&vector).map_err(|err| RagError::Storage(err.to_string()))?;

            let matches = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT c.content, \
                         vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                         FROM chunk_embeddings e \
                         JOIN chunks c ON c.rowid = e.rowid \
                         ORDER BY distance ASC \
                         LIMIT {top_k}"
                    ))?;
                    let rows =
                        stmt.query_map([embedding_json.as_str()], |row| row.get::<_, String>(0))?;
                    let mut matches = Vec::new();
                    for row in rows {
                        matches.push(row?);
                    }
                    Ok::<_, tokio_rusqlite::rusqlite::Error>(matches)
                })
                .await
                .map_err(|err| RagError::Storage(err.to_string()))?;
            results.push(matches);
        }

        debug!(
            queries = query_texts.len(),
            collection = %self.collection,
            "queried vector store"
        );
        Ok(results)
    }

    async fn document_exists(&self, doc_id: &str) -> bool {
        match self.chunk_exists(dedup_probe_id(doc_id)).await {
            Ok(exists) => {
                debug!(document = %doc_id, exists, "dedup probe");
                exists
            }
            Err(err) => {
                error!(
                    document = %doc_id,
                    %err,
                    "dedup probe failed, treating document as absent"
                );
                false
            }
        }
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok::<_, tokio_rusqlite::rusqlite::Error>(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}

/// Registers `sqlite-vec` as an auto-loaded extension, once per process.
fn register_sqlite_vec() -> Result<(), RagError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| unsafe {
        type SqliteExtensionInit = unsafe extern "C" fn(
            *mut ffi::sqlite3,
            *mut *mut c_char,
            *const ffi::sqlite3_api_routines,
        ) -> i32;

        let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
        let init_fn: SqliteExtensionInit =
            transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
        let rc = ffi::sqlite3_auto_extension(Some(init_fn));
        if rc != 0 {
            Err(format!("failed to register sqlite-vec extension (code {rc})"))
        } else {
            Ok(())
        }
    })
    .clone()
    .map_err(RagError::Storage)
}
