//! Shared error taxonomy for the pipeline.
//!
//! Every component returns [`PipelineError`] at its boundary; nothing is
//! allowed to escape as a panic. The variants map one-to-one onto the
//! transport status codes an outer interface layer would emit (see
//! [`PipelineError::status_code`]).

use std::path::PathBuf;

use thiserror::Error;

/// Failure conditions surfaced by pipeline components.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required configuration variable is absent.
    #[error("configuration error: missing required variable {0}")]
    Config(String),

    /// A source file, artifact, or collection could not be located.
    #[error("not found: {0}")]
    NotFound(String),

    /// A read or write failed.
    #[error("I/O failure: {0}")]
    Io(String),

    /// The chunk artifact could not be written. Chunking itself succeeded;
    /// the in-memory count is reported so callers can still act on it.
    #[error("failed to write chunk artifact {path}: {detail} ({chunks_computed} chunks were produced in memory)")]
    ArtifactWrite {
        path: PathBuf,
        chunks_computed: usize,
        detail: String,
    },

    /// The vector storage backend rejected an operation.
    #[error("storage failure: {0}")]
    Storage(String),

    /// An embedding model call failed.
    #[error("embedding failure: {0}")]
    Embedding(String),

    /// The external converter process is not reachable.
    #[error("converter container for image '{0}' is not running")]
    ConverterUnavailable(String),

    /// The external converter ran and reported an error. The message is the
    /// tool's own diagnostic text, verbatim.
    #[error("converter failure: {0}")]
    Converter(String),

    /// A generation client returned output that could not be parsed as
    /// requested.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    /// An HTTP request to an upstream provider failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Transport status code for this failure, for outer layers that map
    /// structured results onto HTTP responses.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::NotFound(_) => 404,
            PipelineError::ConverterUnavailable(_) => 503,
            PipelineError::MalformedResponse(_) | PipelineError::Http(_) => 502,
            PipelineError::Config(_)
            | PipelineError::Io(_)
            | PipelineError::ArtifactWrite { .. }
            | PipelineError::Storage(_)
            | PipelineError::Embedding(_)
            | PipelineError::Converter(_) => 500,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}
