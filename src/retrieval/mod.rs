//! High-level vector store: idempotent ingestion and re-ranked search.

pub mod ranker;

use std::path::Path;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chunking::Chunk;
use crate::ingestion::{artifact, chunks_to_records};
use crate::stores::{QueryResponse, VectorBackend};
use crate::types::PipelineError;

/// Records inserted per backend call, bounding per-call payload size.
const INSERT_BATCH_SIZE: usize = 100;

/// Result of an ingestion request. The skip is a deliberate short-circuit,
/// not an error, and is reported with its own status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Records were embedded and persisted.
    Ingested { records: usize },
    /// The collection already held records; nothing was written.
    SkippedExisting { existing: usize },
}

/// Ranked search output: nested arrays, one row per query, mirroring the
/// backend's wire shape after re-ranking and truncation.
pub type SearchResults = QueryResponse;

/// Owns one collection and serves ingestion and search over it.
///
/// Ingestion is idempotent by collection occupancy: a non-empty collection
/// is treated as already ingested. The check-then-insert sequence runs
/// under a per-store mutex so concurrent first-time writers through the
/// same store cannot double-ingest.
pub struct VectorStore<B: VectorBackend> {
    backend: B,
    ingest_lock: Mutex<()>,
}

impl<B: VectorBackend> VectorStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            ingest_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Deserializes a chunk artifact from disk.
    pub async fn load(path: &Path) -> Result<Vec<Chunk>, PipelineError> {
        artifact::load_chunks(path).await
    }

    /// Embeds and persists the chunk list, unless the collection already
    /// holds records.
    pub async fn process_and_store(&self, chunks: &[Chunk]) -> Result<StoreOutcome, PipelineError> {
        let _guard = self.ingest_lock.lock().await;

        let existing = self.backend.count().await?;
        if existing > 0 {
            info!(existing, "collection already populated, skipping ingestion");
            return Ok(StoreOutcome::SkippedExisting { existing });
        }

        let records = chunks_to_records(chunks)?;
        let total = records.len();
        for batch in records.chunks(INSERT_BATCH_SIZE) {
            let mut ids = Vec::with_capacity(batch.len());
            let mut documents = Vec::with_capacity(batch.len());
            let mut metadatas = Vec::with_capacity(batch.len());
            for record in batch {
                ids.push(record.id.clone());
                documents.push(record.enriched_text.clone());
                metadatas.push(record.metadata.clone());
            }
            self.backend.add(ids, documents, metadatas).await?;
        }

        info!(records = total, "ingestion complete");
        Ok(StoreOutcome::Ingested { records: total })
    }

    /// Ranked semantic search: over-fetches candidates by backend distance,
    /// re-ranks them by content richness, and truncates to `n_results`.
    pub async fn search(
        &self,
        query_text: &str,
        n_results: usize,
    ) -> Result<SearchResults, PipelineError> {
        // Over-fetch so the re-ranker has material beyond the requested
        // count; bounds are part of the observable contract.
        let fetch_count = (n_results * 3).max(10).min(50);
        let response = self
            .backend
            .query(&[query_text.to_string()], fetch_count)
            .await?;
        debug!(
            query = query_text,
            fetched = response.documents.first().map_or(0, Vec::len),
            "re-ranking candidates"
        );

        let mut results = SearchResults::default();
        for ((documents, metadatas), distances) in response
            .documents
            .into_iter()
            .zip(response.metadatas)
            .zip(response.distances)
        {
            let (documents, metadatas, distances) =
                ranker::rerank(documents, metadatas, distances, n_results);
            results.documents.push(documents);
            results.metadatas.push(metadatas);
            results.distances.push(distances);
        }
        Ok(results)
    }

    /// True iff the collection holds at least one record.
    pub async fn collection_exists(&self) -> Result<bool, PipelineError> {
        Ok(self.backend.count().await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory backend that records call shapes for orchestration tests.
    #[derive(Default)]
    struct RecordingBackend {
        rows: parking_lot::Mutex<Vec<(String, String, serde_json::Value)>>,
        add_calls: AtomicUsize,
        last_fetch: AtomicUsize,
    }

    #[async_trait]
    impl VectorBackend for RecordingBackend {
        async fn add(
            &self,
            ids: Vec<String>,
            documents: Vec<String>,
            metadatas: Vec<serde_json::Value>,
        ) -> Result<(), PipelineError> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock();
            for ((id, doc), meta) in ids.into_iter().zip(documents).zip(metadatas) {
                rows.push((id, doc, meta));
            }
            Ok(())
        }

        async fn query(
            &self,
            query_texts: &[String],
            n_results: usize,
        ) -> Result<QueryResponse, PipelineError> {
            self.last_fetch.store(n_results, Ordering::SeqCst);
            let rows = self.rows.lock();
            let mut response = QueryResponse::default();
            for _ in query_texts {
                let taken: Vec<_> = rows.iter().take(n_results).cloned().collect();
                response
                    .documents
                    .push(taken.iter().map(|r| r.1.clone()).collect());
                response
                    .metadatas
                    .push(taken.iter().map(|r| r.2.clone()).collect());
                response
                    .distances
                    .push((0..taken.len()).map(|i| i as f32 * 0.1).collect());
            }
            Ok(response)
        }

        async fn count(&self) -> Result<usize, PipelineError> {
            Ok(self.rows.lock().len())
        }
    }

    fn chunk(content: &str) -> Chunk {
        Chunk {
            content: content.into(),
            metadata: crate::chunking::ChunkMetadata {
                source: "book.md".into(),
                header_1: "H".into(),
                header_2: String::new(),
                header_3: String::new(),
                referenced_images: vec![],
                has_image: false,
                is_split: false,
                content_length: content.chars().count(),
            },
        }
    }

    #[tokio::test]
    async fn second_ingestion_is_a_noop() {
        let store = VectorStore::new(RecordingBackend::default());
        let chunks = vec![chunk("alpha"), chunk("beta")];

        let first = store.process_and_store(&chunks).await.unwrap();
        assert_eq!(first, StoreOutcome::Ingested { records: 2 });

        let second = store.process_and_store(&chunks).await.unwrap();
        assert_eq!(second, StoreOutcome::SkippedExisting { existing: 2 });
        assert_eq!(store.backend().rows.lock().len(), 2);
    }

    #[tokio::test]
    async fn ingestion_batches_in_hundreds() {
        let store = VectorStore::new(RecordingBackend::default());
        let chunks: Vec<Chunk> = (0..250).map(|i| chunk(&format!("chunk {i}"))).collect();

        store.process_and_store(&chunks).await.unwrap();
        assert_eq!(store.backend().add_calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.backend().rows.lock().len(), 250);
        assert_eq!(store.backend().rows.lock()[0].0, "chunk_0");
        assert_eq!(store.backend().rows.lock()[249].0, "chunk_249");
    }

    #[tokio::test]
    async fn search_overfetch_respects_literal_bounds() {
        let store = VectorStore::new(RecordingBackend::default());
        store.process_and_store(&[chunk("only")]).await.unwrap();

        store.search("q", 1).await.unwrap();
        assert_eq!(store.backend().last_fetch.load(Ordering::SeqCst), 10);

        store.search("q", 5).await.unwrap();
        assert_eq!(store.backend().last_fetch.load(Ordering::SeqCst), 15);

        store.search("q", 40).await.unwrap();
        assert_eq!(store.backend().last_fetch.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn search_on_empty_collection_returns_empty_row() {
        let store = VectorStore::new(RecordingBackend::default());
        assert!(!store.collection_exists().await.unwrap());

        let results = store.search("anything", 3).await.unwrap();
        assert_eq!(results.documents, vec![Vec::<String>::new()]);
    }

    #[tokio::test]
    async fn search_applies_length_then_distance_ordering() {
        let store = VectorStore::new(RecordingBackend::default());
        store
            .process_and_store(&[chunk("tiny"), chunk("the longest document of all")])
            .await
            .unwrap();

        // Backend returns insertion order with ascending distances, so the
        // longer-but-farther document must win after re-ranking.
        let results = store.search("q", 2).await.unwrap();
        assert!(results.documents[0][0].contains("longest"));
    }
}
