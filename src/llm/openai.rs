use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::embedding::normalize_embedding;
use super::provider::EmbeddingProvider;
use super::types::EmbeddingVector;
use crate::core::config::settings::OpenAiConfig;
use crate::core::errors::ApiError;

const SERVICE: &str = "openai";

/// OpenAI-compatible `/embeddings` client. Used by the ingestion job.
#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &OpenAiConfig, api_key: String) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.embedding_model.clone(),
            dimensions: None,
            client: Client::new(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn request_body(&self, text: &str) -> Value {
        let mut body = json!({
            "model": self.model,
            "input": text,
            "encoding_format": "float",
        });
        if let (Some(obj), Some(dim)) = (body.as_object_mut(), self.dimensions) {
            obj.insert("dimensions".to_string(), json!(dim));
        }
        body
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ApiError> {
        let url = format!("{}/embeddings", self.base_url);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("OpenAI embed error ({}): {}", status, text.trim()),
            ));
        }

        let payload: Value = res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
        Ok(normalize_embedding(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_dimensions_only_when_set() {
        let config = OpenAiConfig::default();
        let plain = OpenAiEmbeddingProvider::new(&config, "k".into());
        let body = plain.request_body("chunk");
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"], "chunk");
        assert!(body.get("dimensions").is_none());

        let sized = plain.with_dimensions(768);
        assert_eq!(sized.request_body("chunk")["dimensions"], 768);
    }
}
