//! Core data types for the chunking pipeline.

use serde::{Deserialize, Serialize};

/// A heading-delimited span of source text, pre-refinement.
///
/// Segments partition the document: concatenating their contents in order
/// reproduces the source exactly. The heading line itself stays in
/// `content` so downstream embedding text keeps the heading for grounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralSegment {
    pub header_1: String,
    pub header_2: String,
    pub header_3: String,
    pub content: String,
}

impl StructuralSegment {
    /// Character length of the content with surrounding whitespace removed,
    /// the unit the minimum-length filter operates on.
    pub fn stripped_len(&self) -> usize {
        self.content.trim().chars().count()
    }
}

/// Provenance and structure metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document identifier (filename).
    pub source: String,
    pub header_1: String,
    pub header_2: String,
    pub header_3: String,
    /// Relative image paths referenced inline, in document order.
    pub referenced_images: Vec<String>,
    pub has_image: bool,
    /// True when this chunk came out of secondary size-based splitting.
    pub is_split: bool,
    /// Character count of the chunk content.
    pub content_length: usize,
}

/// The unit of retrieval: bounded-length content plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Tunables for the chunking pipeline.
#[derive(Debug, Clone)]
pub struct ChunkingParams {
    /// Chunks whose stripped content is shorter than this are dropped.
    pub min_chunk_len: usize,
    /// Segments longer than this (in characters) are refined.
    pub max_safe_len: usize,
    /// Characters of trailing context injected into the next piece.
    pub overlap: usize,
    /// Separator hierarchy, coarsest first; an empty string means
    /// character-level splitting as the last resort.
    pub separators: Vec<String>,
}

impl ChunkingParams {
    /// Paragraph breaks, line breaks, CJK and ASCII sentence enders, spaces,
    /// then unconditional character-level splitting.
    pub fn default_separators() -> Vec<String> {
        ["\n\n", "\n", "。", "！", "？", ". ", " ", ""]
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            min_chunk_len: 100,
            max_safe_len: 1500,
            overlap: 150,
            separators: Self::default_separators(),
        }
    }
}

/// Character count of a string, the length unit used throughout chunking.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_tunables() {
        let params = ChunkingParams::default();
        assert_eq!(params.min_chunk_len, 100);
        assert_eq!(params.max_safe_len, 1500);
        assert_eq!(params.overlap, 150);
        assert_eq!(params.separators.last().map(String::as_str), Some(""));
    }

    #[test]
    fn chunk_round_trips_through_json() {
        let chunk = Chunk {
            content: "## Variables\nA variable is a name.".into(),
            metadata: ChunkMetadata {
                source: "book.md".into(),
                header_1: "Basics".into(),
                header_2: "Variables".into(),
                header_3: String::new(),
                referenced_images: vec!["images/fig1.png".into()],
                has_image: true,
                is_split: false,
                content_length: 34,
            },
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn stripped_len_counts_characters_not_bytes() {
        let segment = StructuralSegment {
            header_1: String::new(),
            header_2: String::new(),
            header_3: String::new(),
            content: "  变量是名字  ".into(),
        };
        assert_eq!(segment.stripped_len(), 5);
    }
}
