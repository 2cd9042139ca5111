//! Storage backends for the embedding index.
//!
//! The [`VectorBackend`] trait is the boundary between the retrieval layer
//! and a persistent, named-collection embedding index: bulk insertion of
//! (id, document, metadata) rows, nearest-neighbor queries returning one
//! result row per query text, and a record count. The shipped
//! implementation is [`sqlite::SqliteCollection`], backed by `sqlite-vec`.

pub mod sqlite;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::types::PipelineError;

pub use sqlite::{SqliteCollection, StoredRecord};

/// Addresses one collection's database file, scoped per tenant and per
/// collection name so distinct collections never share storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionScope {
    pub data_dir: PathBuf,
    pub tenant: String,
    pub collection: String,
}

impl CollectionScope {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        tenant: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            tenant: tenant.into(),
            collection: collection.into(),
        }
    }

    /// Database file backing this collection.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir
            .join(&self.tenant)
            .join("vector_db")
            .join(format!("{}.sqlite3", self.collection))
    }
}

/// Raw query output: nested arrays, one row per query text, candidates
/// ordered by the backend's native distance metric (ascending).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<serde_json::Value>>,
    pub distances: Vec<Vec<f32>>,
}

/// Persistent, named-collection embedding index.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert rows in bulk. The three arrays are parallel; the backend
    /// computes embeddings for `documents` with the collection's model.
    async fn add(
        &self,
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<serde_json::Value>,
    ) -> Result<(), PipelineError>;

    /// Nearest-neighbor candidates for each query text, at most
    /// `n_results` per row, nearest first.
    async fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
    ) -> Result<QueryResponse, PipelineError>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_paths_isolate_tenant_and_collection() {
        let a = CollectionScope::new("/data", "alice", "physics");
        let b = CollectionScope::new("/data", "alice", "history");
        let c = CollectionScope::new("/data", "bob", "physics");

        assert_eq!(
            a.db_path(),
            PathBuf::from("/data/alice/vector_db/physics.sqlite3")
        );
        assert_ne!(a.db_path(), b.db_path());
        assert_ne!(a.db_path(), c.db_path());
    }
}
