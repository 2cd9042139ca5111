//! Text-generation provider clients.
//!
//! Providers are interchangeable request/response wrappers behind
//! [`GenerationClient`]. Structured output is layered on plain generation:
//! `generate_json` asks for JSON, then parses a fenced code block (or the
//! raw body) and fails with a distinct parse error when no valid JSON is
//! present.

pub mod gemini;
pub mod openai;

use async_trait::async_trait;

use crate::types::PipelineError;

pub use gemini::GeminiClient;
pub use openai::OpenAiCompatClient;

/// Per-request generation knobs.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

/// A text-generation provider.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate free-form text for `prompt`.
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, PipelineError>;

    /// Generate structured JSON, optionally constrained by `schema`.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: Option<&serde_json::Value>,
        options: &GenerationOptions,
    ) -> Result<serde_json::Value, PipelineError> {
        let instruction = match schema {
            Some(schema) => {
                let rendered = serde_json::to_string_pretty(schema)
                    .map_err(|err| PipelineError::MalformedResponse(err.to_string()))?;
                format!("\n\nReturn data matching this JSON schema:\n{rendered}")
            }
            None => "\n\nReturn valid JSON.".to_string(),
        };
        let text = self
            .generate_text(&format!("{prompt}{instruction}"), options)
            .await?;
        extract_json(&text)
    }
}

/// Parses the JSON payload out of a generation response: a ` ```json `
/// fence first, then any fence, then the raw body.
pub fn extract_json(text: &str) -> Result<serde_json::Value, PipelineError> {
    let candidate = fenced_block(text, "```json")
        .or_else(|| fenced_block(text, "```"))
        .unwrap_or(text);
    serde_json::from_str(candidate.trim()).map_err(|err| {
        PipelineError::MalformedResponse(format!("no valid JSON in generation output: {err}"))
    })
}

fn fenced_block<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let start = text.find(fence)? + fence.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_fenced_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nanything after";
        assert_eq!(extract_json(text).unwrap(), serde_json::json!({"a": 1}));
    }

    #[test]
    fn extracts_bare_fenced_block() {
        let text = "```\n[1, 2, 3]\n```";
        assert_eq!(extract_json(text).unwrap(), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn parses_raw_json_body() {
        assert_eq!(
            extract_json("{\"ok\": true}").unwrap(),
            serde_json::json!({"ok": true})
        );
    }

    #[test]
    fn non_json_output_is_a_parse_failure() {
        let err = extract_json("I cannot answer that.").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
        assert_eq!(err.status_code(), 502);
    }
}
