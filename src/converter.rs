//! Control shim for the external PDF-to-Markdown converter.
//!
//! The converter runs as a long-lived container; this module locates it by
//! image ancestry, checks the idempotency condition (non-empty output at
//! the expected path), and otherwise executes the conversion inside the
//! container, surfacing the tool's own diagnostics verbatim on failure.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::info;

use crate::config::Settings;
use crate::types::PipelineError;

/// In-container conversion command.
const CONVERTER_BIN: &str = "mineru";

/// Result of a conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// The tool ran and produced output at the given path.
    Converted { output: PathBuf },
    /// Non-empty output already existed; the tool was not invoked.
    AlreadyConverted { output: PathBuf },
}

impl ConvertOutcome {
    pub fn output(&self) -> &Path {
        match self {
            ConvertOutcome::Converted { output } | ConvertOutcome::AlreadyConverted { output } => {
                output
            }
        }
    }
}

/// Handle on the external converter's control plane.
#[derive(Debug, Clone)]
pub struct PdfConverter {
    image: String,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl PdfConverter {
    pub fn new(
        image: impl Into<String>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            image: image.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.converter_image.clone(),
            settings.input_dir.clone(),
            settings.output_dir.clone(),
        )
    }

    /// Id of the running converter container, if any.
    pub async fn running_container(&self) -> Result<Option<String>, PipelineError> {
        let ancestor = format!("ancestor={}", self.image);
        let output = Command::new("docker")
            .args(["ps", "-f", ancestor.as_str(), "-f", "status=running", "-q"])
            .output()
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        Ok(if id.is_empty() { None } else { Some(id) })
    }

    /// Converts `file_name` from the input directory into the output
    /// directory, skipping work that already exists.
    pub async fn convert(&self, file_name: &str) -> Result<ConvertOutcome, PipelineError> {
        let Some(container) = self.running_container().await? else {
            return Err(PipelineError::ConverterUnavailable(self.image.clone()));
        };

        let input_path = self.input_dir.join(file_name);
        if !input_path.exists() {
            return Err(PipelineError::NotFound(format!(
                "input file not found: {}",
                input_path.display()
            )));
        }

        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let output_path = self.output_dir.join(stem);
        if dir_has_entries(&output_path).await? {
            info!(output = %output_path.display(), "output exists, skipping conversion");
            return Ok(ConvertOutcome::AlreadyConverted {
                output: output_path,
            });
        }

        info!(file_name, container = %container, "converting");
        let container_input = format!("/app/input/{file_name}");
        let result = Command::new("docker")
            .args([
                "exec",
                container.as_str(),
                CONVERTER_BIN,
                "-p",
                container_input.as_str(),
                "-o",
                "/app/output",
            ])
            .output()
            .await?;

        if result.status.success() {
            Ok(ConvertOutcome::Converted {
                output: output_path,
            })
        } else {
            Err(PipelineError::Converter(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ))
        }
    }
}

async fn dir_has_entries(path: &Path) -> Result<bool, PipelineError> {
    if !path.exists() {
        return Ok(false);
    }
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_some())
}
