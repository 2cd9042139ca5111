//! Gemini generateContent client.

use async_trait::async_trait;

use crate::types::PipelineError;

use super::{GenerationClient, GenerationOptions};

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(
            "https://generativelanguage.googleapis.com/v1beta",
            api_key,
            model,
        )
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, PipelineError> {
        let mut body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        });
        if let Some(system) = &options.system_prompt {
            body["systemInstruction"] = serde_json::json!({"parts": [{"text": system}]});
        }
        if let Some(max_tokens) = options.max_tokens {
            body["generationConfig"] = serde_json::json!({"maxOutputTokens": max_tokens});
        }

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let value: serde_json::Value = response.json().await?;

        value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::MalformedResponse(
                    "generateContent response contained no text part".to_string(),
                )
            })
    }
}
