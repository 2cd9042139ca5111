//! ```text
//! PDF source ──► converter (external tool control) ──► rendered Markdown
//!
//! Markdown ──► chunking::structural ──► chunking::refine ──┐
//!                                                          │
//!                           chunking::assembler ◄──────────┘
//!                                    │
//!                                    ├─► ingestion::artifact (chunks.json)
//!                                    └─► ingestion::records ──► VectorRecord batch
//!
//! VectorRecord batch ──► stores::sqlite (sqlite-vec collection)
//!                                    │
//! Query text ──► retrieval::VectorStore::search ──► retrieval::ranker ──► caller
//! ```

pub mod chunking;
pub mod clients;
pub mod config;
pub mod converter;
pub mod embeddings;
pub mod ingestion;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use chunking::{Chunk, ChunkAssembler, ChunkMetadata, ChunkReport, ChunkingParams};
pub use config::Settings;
pub use converter::{ConvertOutcome, PdfConverter};
pub use retrieval::{SearchResults, StoreOutcome, VectorStore};
pub use stores::{CollectionScope, SqliteCollection};
pub use types::PipelineError;
