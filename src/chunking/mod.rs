//! Two-stage Markdown chunking.
//!
//! Stage one ([`structural`]) partitions a document into heading-scoped
//! segments. Stage two ([`refine`]) re-splits segments that exceed the
//! embedding window into overlapping, bounded pieces. The
//! [`assembler`] composes both stages, filters degenerate output, and
//! attaches provenance metadata. Both stages are pure functions over text
//! and are unit-tested independently.

pub mod assembler;
pub mod refine;
pub mod structural;
pub mod types;

pub use assembler::{ChunkAssembler, ChunkReport, extract_image_refs, locate_markdown};
pub use refine::{Refined, SizeBoundedRefiner};
pub use structural::split_by_headings;
pub use types::{Chunk, ChunkMetadata, ChunkingParams, StructuralSegment};
