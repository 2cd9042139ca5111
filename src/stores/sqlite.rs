//! sqlite-vec backed collection store.

use std::mem::transmute;
use std::os::raw::c_char;
use std::sync::Once;

use async_trait::async_trait;
use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{Column, ColumnValue, SqliteVectorStore, SqliteVectorStoreTable};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{Connection, ffi};
use tracing::debug;

use crate::types::PipelineError;

use super::{CollectionScope, QueryResponse, VectorBackend};

/// One stored row: enriched text plus its flattened metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

impl SqliteVectorStoreTable for StoredRecord {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("metadata", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("metadata", Box::new(self.metadata.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

/// A named, persistent collection of embedded records.
///
/// The embedding model is fixed when the collection is opened; the
/// underlying database file is created on first open (get-or-create
/// semantics). Model and connection belong to this instance and must not
/// be shared with collections opened under a different model.
#[derive(Clone)]
pub struct SqliteCollection<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, StoredRecord>,
    /// Separate connection handle for direct SQL not covered by rig-sqlite.
    conn: Connection,
    model: E,
}

impl<E> SqliteCollection<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Opens (creating if absent) the collection addressed by `scope`.
    pub async fn open(scope: &CollectionScope, model: E) -> Result<Self, PipelineError> {
        Self::register_sqlite_vec()?;
        let path = scope.db_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let conn = Connection::open(&path)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| PipelineError::Storage(err.to_string()))?;
        // Clone connection for direct access before moving into the store.
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, &model)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        debug!(path = %path.display(), "opened collection");
        Ok(Self {
            inner: store,
            conn: conn_for_queries,
            model,
        })
    }

    fn register_sqlite_vec() -> Result<(), PipelineError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
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
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(PipelineError::Storage)
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Embedding>, PipelineError> {
        self.model
            .embed_texts(texts)
            .await
            .map_err(|err| PipelineError::Embedding(err.to_string()))
    }
}

#[async_trait]
impl<E> VectorBackend for SqliteCollection<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    async fn add(
        &self,
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), PipelineError> {
        if ids.len() != documents.len() || ids.len() != metadatas.len() {
            return Err(PipelineError::Storage(
                "ids, documents, and metadatas must be parallel arrays".to_string(),
            ));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let embeddings = self.embed(documents.clone()).await?;
        let mut rows = Vec::with_capacity(ids.len());
        for (((id, content), metadata), embedding) in ids
            .into_iter()
            .zip(documents)
            .zip(metadatas)
            .zip(embeddings)
        {
            let record = StoredRecord {
                id,
                content,
                metadata,
            };
            rows.push((record, OneOrMany::one(embedding)));
        }
        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))?;
        Ok(())
    }

    async fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
    ) -> Result<QueryResponse, PipelineError> {
        let mut response = QueryResponse::default();

        for text in query_texts {
            let embedding = self
                .embed(vec![text.clone()])
                .await?
                .pop()
                .ok_or_else(|| PipelineError::Embedding("empty embedding batch".to_string()))?;
            let embedding_json = serde_json::to_string(&embedding.vec)
                .map_err(|err| PipelineError::Storage(err.to_string()))?;

            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT c.content, c.metadata, \
                             vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                             FROM chunks c \
                             JOIN chunks_embeddings e ON c.id = e.id \
                             ORDER BY distance ASC \
                             LIMIT {}",
                            n_results
                        ))
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;

                    let mapped = stmt
                        .query_map([&embedding_json], |row| {
                            let content: String = row.get(0)?;
                            let metadata: String = row.get(1)?;
                            let distance: f32 = row.get(2)?;
                            Ok((content, metadata, distance))
                        })
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;

                    let mut results = Vec::new();
                    for row in mapped {
                        results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                    }
                    Ok(results)
                })
                .await
                .map_err(|err| PipelineError::Storage(err.to_string()))?;

            let mut documents = Vec::with_capacity(rows.len());
            let mut metadatas = Vec::with_capacity(rows.len());
            let mut distances = Vec::with_capacity(rows.len());
            for (content, metadata, distance) in rows {
                documents.push(content);
                metadatas.push(
                    serde_json::from_str(&metadata)
                        .unwrap_or(serde_json::Value::String(metadata)),
                );
                distances.push(distance);
            }
            response.documents.push(documents);
            response.metadatas.push(metadatas);
            response.distances.push(distances);
        }

        Ok(response)
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| PipelineError::Storage(err.to_string()))
    }
}
