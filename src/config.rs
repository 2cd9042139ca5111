//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;

use crate::stores::CollectionScope;
use crate::types::PipelineError;

/// Default converter container image.
const DEFAULT_CONVERTER_IMAGE: &str = "mineru:latest";

/// Paths and handles every pipeline component is configured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root for per-tenant storage (vector databases, artifacts).
    pub data_dir: PathBuf,
    /// Where source PDFs are picked up.
    pub input_dir: PathBuf,
    /// Where the converter writes rendered Markdown.
    pub output_dir: PathBuf,
    /// Converter container image.
    pub converter_image: String,
}

impl Settings {
    /// Loads settings from the process environment after a `.env` pass.
    ///
    /// Each missing required variable is a configuration error naming it,
    /// so callers can react per-request instead of crashing.
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PipelineError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| PipelineError::Config(name.to_string()))
        };
        Ok(Self {
            data_dir: require("DATA_DIR")?.into(),
            input_dir: require("INPUT_DIR")?.into(),
            output_dir: require("OUTPUT_DIR")?.into(),
            converter_image: lookup("CONVERTER_IMAGE")
                .unwrap_or_else(|| DEFAULT_CONVERTER_IMAGE.to_string()),
        })
    }

    /// Storage scope for one tenant's collection.
    pub fn collection_scope(&self, tenant: &str, collection: &str) -> CollectionScope {
        CollectionScope::new(self.data_dir.clone(), tenant, collection)
    }
}
