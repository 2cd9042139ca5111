//! OpenAI-compatible chat-completions client.
//!
//! Covers every provider speaking the same wire format; OpenAI and
//! DeepSeek presets differ only in base URL and default model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

use super::{GenerationClient, GenerationOptions};

#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("https://api.openai.com/v1", api_key, "gpt-4o")
    }

    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new("https://api.deepseek.com/v1", api_key, "deepseek-chat")
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerationClient for OpenAiCompatClient {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, PipelineError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &options.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let parsed: ChatResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PipelineError::MalformedResponse("chat response contained no content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn sends_messages_and_reads_first_choice() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .json_body_partial(
                    r#"{"model": "test-model", "messages": [{"role": "system", "content": "be brief"}, {"role": "user", "content": "hello"}]}"#,
                );
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hi"}}]
            }));
        });

        let client = OpenAiCompatClient::new(server.url("/v1"), "key", "test-model");
        let options = GenerationOptions {
            max_tokens: None,
            system_prompt: Some("be brief".into()),
        };
        let text = client.generate_text("hello", &options).await.unwrap();

        mock.assert();
        assert_eq!(text, "hi");
    }

    #[tokio::test]
    async fn generate_json_parses_fenced_output() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": "```json\n{\"answer\": 42}\n```"
                }}]
            }));
        });

        let client = OpenAiCompatClient::new(server.url("/v1"), "key", "m");
        let value = client
            .generate_json("q", None, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"answer": 42}));
    }

    #[tokio::test]
    async fn non_json_output_surfaces_parse_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "plain prose"}}]
            }));
        });

        let client = OpenAiCompatClient::new(server.url("/v1"), "key", "m");
        let err = client
            .generate_json("q", None, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(serde_json::json!({"choices": []}));
        });

        let client = OpenAiCompatClient::new(server.url("/v1"), "key", "m");
        let err = client
            .generate_text("q", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }
}
