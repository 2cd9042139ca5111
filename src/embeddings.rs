//! Embedding models a collection can be opened with.
//!
//! A collection's embedding model is fixed at creation and must be used for
//! every subsequent query against it, so both models here implement rig's
//! [`EmbeddingModel`] and are cheap to clone into the store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rig::embeddings::embedding::{Embedding, EmbeddingError, EmbeddingModel};
use serde::{Deserialize, Serialize};

/// Deterministic hash-derived embeddings for tests and offline runs.
///
/// Identical text always produces identical vectors, so store/search tests
/// can assert exact retrieval behavior without a provider. A small interning
/// cache avoids rehashing repeated inputs.
#[derive(Clone)]
pub struct HashEmbedding {
    dims: usize,
    cache: Arc<RwLock<HashMap<String, Vec<f64>>>>,
}

impl HashEmbedding {
    pub fn new() -> Self {
        Self::with_dims(16)
    }

    pub fn with_dims(dims: usize) -> Self {
        Self {
            dims,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashEmbedding {
    const MAX_DOCUMENTS: usize = 64;

    fn ndims(&self) -> usize {
        self.dims
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let docs: Vec<String> = texts.into_iter().collect();
        let dims = self.dims;
        let cache = Arc::clone(&self.cache);
        async move {
            Ok(docs
                .into_iter()
                .map(|document| {
                    let cached = cache.read().get(&document).cloned();
                    let vec = match cached {
                        Some(vec) => vec,
                        None => {
                            let vec = hash_to_vec(&document, dims);
                            cache.write().insert(document.clone(), vec.clone());
                            vec
                        }
                    };
                    Embedding { document, vec }
                })
                .collect())
        }
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64) / u32::MAX as f64
        })
        .collect()
}

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct RemoteEmbedding {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl RemoteEmbedding {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dims: usize,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            dims,
        }
    }

    /// OpenAI's small embedding model.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new(
            "https://api.openai.com/v1/embeddings",
            api_key,
            "text-embedding-3-small",
            1536,
        )
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f64>,
}

impl EmbeddingModel for RemoteEmbedding {
    const MAX_DOCUMENTS: usize = 100;

    fn ndims(&self) -> usize {
        self.dims
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let docs: Vec<String> = texts.into_iter().collect();
        let this = self.clone();
        async move {
            let body = EmbeddingRequest {
                model: &this.model,
                input: &docs,
            };
            let response = this
                .http
                .post(&this.endpoint)
                .bearer_auth(&this.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| EmbeddingError::ProviderError(err.to_string()))?
                .error_for_status()
                .map_err(|err| EmbeddingError::ProviderError(err.to_string()))?;
            let parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|err| EmbeddingError::ProviderError(err.to_string()))?;
            if parsed.data.len() != docs.len() {
                return Err(EmbeddingError::ProviderError(format!(
                    "expected {} embeddings, got {}",
                    docs.len(),
                    parsed.data.len()
                )));
            }
            Ok(docs
                .into_iter()
                .zip(parsed.data)
                .map(|(document, row)| Embedding {
                    document,
                    vec: row.embedding,
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn hash_embeddings_are_deterministic() {
        let model = HashEmbedding::new();
        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = model.embed_texts(inputs.clone()).await.unwrap();
        let second = model.embed_texts(inputs).await.unwrap();

        assert_eq!(first[0].vec, second[0].vec);
        assert_eq!(first[0].vec, first[2].vec);
        assert_ne!(first[0].vec, first[1].vec);
        assert_eq!(first[0].vec.len(), model.ndims());
    }

    #[tokio::test]
    async fn remote_embeddings_parse_provider_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(serde_json::json!({
                "data": [
                    {"embedding": [0.1, 0.2, 0.3]},
                    {"embedding": [0.4, 0.5, 0.6]}
                ]
            }));
        });

        let model = RemoteEmbedding::new(
            server.url("/v1/embeddings"),
            "test-key",
            "test-model",
            3,
        );
        let embeddings = model
            .embed_texts(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        mock.assert();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].vec, vec![0.1, 0.2, 0.3]);
        assert_eq!(embeddings[1].document, "b");
    }

    #[tokio::test]
    async fn remote_embedding_count_mismatch_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(serde_json::json!({"data": [{"embedding": [0.1]}]}));
        });

        let model = RemoteEmbedding::new(server.url("/"), "k", "m", 1);
        let err = model
            .embed_texts(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 embeddings"));
    }
}
