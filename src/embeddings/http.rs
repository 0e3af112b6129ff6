//! HTTP client for a hosted, OpenAI-compatible embedding service.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RetrievalError;

use super::EmbeddingProvider;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Provider backed by a `POST {base}/embeddings` endpoint with bearer auth.
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(
        client: Client,
        base_url: Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        let endpoint = base_url
            .join("embeddings")
            .map_err(|err| RetrievalError::Embedding(format!("invalid base url: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?
            .error_for_status()
            .map_err(|err| RetrievalError::Embedding(err.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RetrievalError::Embedding(format!("malformed response: {err}")))?;

        if body.data.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "service returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
