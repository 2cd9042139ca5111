//! Conversion of chunks into storage-ready vector records.
//!
//! The storage backend rejects list-valued metadata fields, so
//! `referenced_images` is flattened to a comma-joined string on the way in
//! and split back on the way out. Embedding input is the chunk content
//! prefixed with its heading path so the heading survives into the vector.

use serde::{Deserialize, Serialize};

use crate::chunking::{Chunk, ChunkMetadata};
use crate::types::PipelineError;

/// A chunk enriched for storage: sequential id, heading-prefixed embedding
/// text, and backend-safe metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// `chunk_<index>`; stable only within one ingestion batch.
    pub id: String,
    pub enriched_text: String,
    pub metadata: serde_json::Value,
}

/// Chunk metadata with `referenced_images` flattened for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub source: String,
    pub header_1: String,
    pub header_2: String,
    pub header_3: String,
    /// Comma-joined relative paths; empty string when there are none.
    pub referenced_images: String,
    pub has_image: bool,
    pub is_split: bool,
    pub content_length: usize,
}

impl From<&ChunkMetadata> for StoredMetadata {
    fn from(meta: &ChunkMetadata) -> Self {
        Self {
            source: meta.source.clone(),
            header_1: meta.header_1.clone(),
            header_2: meta.header_2.clone(),
            header_3: meta.header_3.clone(),
            referenced_images: join_images(&meta.referenced_images),
            has_image: meta.has_image,
            is_split: meta.is_split,
            content_length: meta.content_length,
        }
    }
}

/// Converts a chunk list into records ready for batch insertion. The input
/// chunks are read, never mutated.
pub fn chunks_to_records(chunks: &[Chunk]) -> Result<Vec<VectorRecord>, PipelineError> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let metadata = serde_json::to_value(StoredMetadata::from(&chunk.metadata))
                .map_err(|err| PipelineError::Storage(err.to_string()))?;
            Ok(VectorRecord {
                id: format!("chunk_{index}"),
                enriched_text: enrich(&chunk.metadata, &chunk.content),
                metadata,
            })
        })
        .collect()
}

/// Joins the non-empty heading levels with `" > "`.
pub fn header_path(meta: &ChunkMetadata) -> String {
    [&meta.header_1, &meta.header_2, &meta.header_3]
        .into_iter()
        .filter(|h| !h.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Prefixes the content with its heading path for embedding.
pub fn enrich(meta: &ChunkMetadata, content: &str) -> String {
    format!("Section: {}\nContent: {content}", header_path(meta))
}

/// Flattens an image list to the backend's string representation.
pub fn join_images(images: &[String]) -> String {
    images.join(", ")
}

/// Recovers an image list from the backend's string representation.
pub fn split_images(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with(headers: [&str; 3], images: Vec<&str>, content: &str) -> Chunk {
        Chunk {
            content: content.into(),
            metadata: ChunkMetadata {
                source: "book.md".into(),
                header_1: headers[0].into(),
                header_2: headers[1].into(),
                header_3: headers[2].into(),
                has_image: !images.is_empty(),
                referenced_images: images.into_iter().map(str::to_string).collect(),
                is_split: false,
                content_length: content.chars().count(),
            },
        }
    }

    #[test]
    fn ids_are_sequential_within_a_batch() {
        let chunks = vec![
            chunk_with(["A", "", ""], vec![], "one"),
            chunk_with(["A", "B", ""], vec![], "two"),
        ];
        let records = chunks_to_records(&chunks).unwrap();
        assert_eq!(records[0].id, "chunk_0");
        assert_eq!(records[1].id, "chunk_1");
    }

    #[test]
    fn enriched_text_prepends_heading_path() {
        let chunk = chunk_with(["A", "B", ""], vec![], "body");
        let records = chunks_to_records(&[chunk]).unwrap();
        assert_eq!(records[0].enriched_text, "Section: A > B\nContent: body");
    }

    #[test]
    fn headerless_chunk_keeps_enrichment_shape() {
        let chunk = chunk_with(["", "", ""], vec![], "body");
        let records = chunks_to_records(&[chunk]).unwrap();
        assert_eq!(records[0].enriched_text, "Section: \nContent: body");
    }

    #[test]
    fn empty_levels_are_skipped_in_path() {
        let chunk = chunk_with(["A", "", "C"], vec![], "body");
        assert_eq!(header_path(&chunk.metadata), "A > C");
    }

    #[test]
    fn empty_image_list_flattens_to_empty_string() {
        let chunk = chunk_with(["A", "", ""], vec![], "body");
        let records = chunks_to_records(&[chunk]).unwrap();
        assert_eq!(records[0].metadata["referenced_images"], "");
        assert_eq!(split_images(""), Vec::<String>::new());
    }

    #[test]
    fn image_list_round_trips_through_string_form() {
        let images = vec!["images/a.png".to_string(), "images/b.png".to_string()];
        let joined = join_images(&images);
        assert_eq!(joined, "images/a.png, images/b.png");
        assert_eq!(split_images(&joined), images);
    }

    #[test]
    fn conversion_does_not_mutate_input() {
        let chunks = vec![chunk_with(["A", "", ""], vec!["images/a.png"], "body")];
        let before = chunks.clone();
        let _ = chunks_to_records(&chunks).unwrap();
        assert_eq!(chunks, before);
    }
}
