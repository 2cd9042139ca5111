//! Chunk assembly: structural split, size refinement, metadata extraction.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::fs;
use tracing::{debug, info};

use crate::ingestion::artifact;
use crate::types::PipelineError;

use super::refine::{Refined, SizeBoundedRefiner};
use super::structural::split_by_headings;
use super::types::{char_len, Chunk, ChunkMetadata, ChunkingParams};

/// Inline image references of the form `![alt](images/...)`.
static IMAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\((images/[^)]+)\)").expect("image pattern is valid")
});

/// Converter output layouts searched by [`locate_markdown`].
const CONVERTER_LAYOUTS: [&str; 3] = ["hybrid_auto", "hybrid_ocr", "hybrid_txt"];

/// Summary of one chunking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub source: String,
    pub chunk_count: usize,
    pub split_count: usize,
    pub artifact_path: Option<PathBuf>,
}

/// Orchestrates the two-stage chunking pipeline and attaches metadata.
#[derive(Debug, Clone, Default)]
pub struct ChunkAssembler {
    params: ChunkingParams,
}

impl ChunkAssembler {
    pub fn new(params: ChunkingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ChunkingParams {
        &self.params
    }

    /// Chunk a document already loaded into memory.
    ///
    /// Runs the structural splitter, drops segments whose stripped content
    /// is shorter than `min_chunk_len`, refines over-long segments, and
    /// attaches structure and provenance metadata to every piece. Sub-pieces
    /// inherit the owning segment's headers.
    pub fn assemble(&self, text: &str, source: &str) -> Vec<Chunk> {
        let refiner = SizeBoundedRefiner::new(
            self.params.max_safe_len,
            self.params.overlap,
            &self.params.separators,
        );

        let mut chunks = Vec::new();
        for segment in split_by_headings(text) {
            if segment.stripped_len() < self.params.min_chunk_len {
                continue;
            }
            let (pieces, is_split) = match refiner.refine(&segment.content) {
                Refined::Intact(content) => (vec![content], false),
                Refined::Split(pieces) => (pieces, true),
            };
            for piece in pieces {
                if is_split && char_len(piece.trim()) < self.params.min_chunk_len {
                    continue;
                }
                let referenced_images = extract_image_refs(&piece);
                chunks.push(Chunk {
                    metadata: ChunkMetadata {
                        source: source.to_string(),
                        header_1: segment.header_1.clone(),
                        header_2: segment.header_2.clone(),
                        header_3: segment.header_3.clone(),
                        has_image: !referenced_images.is_empty(),
                        referenced_images,
                        is_split,
                        content_length: char_len(&piece),
                    },
                    content: piece,
                });
            }
        }
        debug!(source, chunks = chunks.len(), "assembled chunks");
        chunks
    }

    /// Chunk a Markdown file and optionally persist the artifact.
    ///
    /// A missing source file is a not-found failure. An artifact write
    /// failure is reported distinctly and still carries the chunk count
    /// computed in memory.
    pub async fn assemble_file(
        &self,
        md_path: &Path,
        source: &str,
        artifact_path: Option<&Path>,
    ) -> Result<ChunkReport, PipelineError> {
        let text = match fs::read_to_string(md_path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::NotFound(format!(
                    "markdown source not found: {}",
                    md_path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let chunks = self.assemble(&text, source);
        let split_count = chunks.iter().filter(|c| c.metadata.is_split).count();

        if let Some(path) = artifact_path {
            artifact::save_chunks(path, &chunks).await.map_err(|err| {
                PipelineError::ArtifactWrite {
                    path: path.to_path_buf(),
                    chunks_computed: chunks.len(),
                    detail: err.to_string(),
                }
            })?;
        }

        info!(
            source,
            chunks = chunks.len(),
            split = split_count,
            "chunking complete"
        );
        Ok(ChunkReport {
            source: source.to_string(),
            chunk_count: chunks.len(),
            split_count,
            artifact_path: artifact_path.map(Path::to_path_buf),
        })
    }
}

/// Extracts relative image paths referenced inline, in document order.
pub fn extract_image_refs(content: &str) -> Vec<String> {
    IMAGE_PATTERN
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Finds the converter's rendered Markdown for `file_name` under
/// `output_root`, checking each known output layout in priority order.
pub async fn locate_markdown(
    output_root: &Path,
    file_name: &str,
) -> Result<PathBuf, PipelineError> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let target = format!("{stem}.md");

    for layout in CONVERTER_LAYOUTS {
        let mut pending = vec![output_root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                if entry.file_name() == std::ffi::OsStr::new(layout) {
                    let candidate = path.join(&target);
                    if candidate.exists() {
                        return Ok(candidate);
                    }
                }
                pending.push(path);
            }
        }
    }

    Err(PipelineError::NotFound(format!(
        "no rendered markdown for '{file_name}' under {}",
        output_root.display()
    )))
}
