//! Persistence of chunk lists as JSON artifacts.

use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::chunking::Chunk;
use crate::types::PipelineError;

/// Writes the chunk list to `path` as pretty-printed JSON, creating parent
/// directories as needed.
pub async fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let serialized =
        serde_json::to_string_pretty(chunks).map_err(|err| PipelineError::Io(err.to_string()))?;
    fs::write(path, serialized).await?;
    info!(path = %path.display(), chunks = chunks.len(), "saved chunk artifact");
    Ok(())
}

/// Reads a chunk list back from `path`.
///
/// A missing file is a not-found condition carrying the full path.
pub async fn load_chunks(path: &Path) -> Result<Vec<Chunk>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::NotFound(format!(
            "chunk artifact not found: {}",
            path.display()
        )));
    }
    let data = fs::read_to_string(path).await?;
    serde_json::from_str(&data)
        .map_err(|err| PipelineError::Io(format!("invalid chunk artifact {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkMetadata;
    use tempfile::tempdir;

    fn sample_chunk() -> Chunk {
        Chunk {
            content: "# A\nbody".into(),
            metadata: ChunkMetadata {
                source: "book.md".into(),
                header_1: "A".into(),
                header_2: String::new(),
                header_3: String::new(),
                referenced_images: vec![],
                has_image: false,
                is_split: false,
                content_length: 8,
            },
        }
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/chunks.json");
        save_chunks(&path, &[sample_chunk()]).await.unwrap();

        let loaded = load_chunks(&path).await.unwrap();
        assert_eq!(loaded, vec![sample_chunk()]);
    }

    #[tokio::test]
    async fn load_missing_artifact_is_not_found() {
        let err = load_chunks(Path::new("/nonexistent/chunks.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert!(err.to_string().contains("/nonexistent/chunks.json"));
    }

    #[tokio::test]
    async fn artifact_shape_matches_wire_contract() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.json");
        save_chunks(&path, &[sample_chunk()]).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert!(first["content"].is_string());
        assert!(first["metadata"]["referenced_images"].is_array());
        assert_eq!(first["metadata"]["source"], "book.md");
        assert_eq!(first["metadata"]["is_split"], false);
        assert_eq!(first["metadata"]["content_length"], 8);
    }
}
