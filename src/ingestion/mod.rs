//! Ingestion utilities between chunking and vector storage.
//!
//! * [`artifact`] — JSON persistence of chunk lists.
//! * [`records`] — conversion of chunks into storage-ready records.

pub mod artifact;
pub mod records;

pub use artifact::{load_chunks, save_chunks};
pub use records::{StoredMetadata, VectorRecord, chunks_to_records, join_images, split_images};
