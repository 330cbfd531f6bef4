use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::embedding::normalize_embedding;
use super::provider::{EmbeddingProvider, FragmentStream, GenerationProvider};
use super::sse::{SseDecoder, SseEvent};
use super::types::{EmbeddingVector, GenerationRequest};
use crate::core::config::settings::GeminiConfig;
use crate::core::errors::ApiError;

const SERVICE: &str = "gemini";

/// Gemini REST client used for both query embeddings and answer generation.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
    output_dimensionality: Option<usize>,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, api_key: String) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            output_dimensionality: None,
            client: Client::new(),
        }
    }

    /// Ask the embedding endpoint for vectors of the collection's dimensionality.
    pub fn with_output_dimensionality(mut self, dimension: usize) -> Self {
        self.output_dimensionality = Some(dimension);
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ApiError> {
        let url = self.model_url(&self.embedding_model, "embedContent");

        let mut body = json!({
            "model": format!("models/{}", self.embedding_model.trim_start_matches("models/")),
            "content": { "parts": [{ "text": text }] },
        });
        if let (Some(obj), Some(dim)) = (body.as_object_mut(), self.output_dimensionality) {
            obj.insert("outputDimensionality".to_string(), json!(dim));
        }

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("Gemini embed error ({}): {}", status, error_message(&text)),
            ));
        }

        let payload: Value = res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
        Ok(normalize_embedding(&payload))
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn generate(&self, request: GenerationRequest) -> Result<FragmentStream, ApiError> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&self.generation_model, "streamGenerateContent")
        );

        let body = generation_body(&request);

        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("Gemini generation error ({}): {}", status, error_message(&text)),
            ));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        for event in decoder.push(&bytes) {
                            if !forward_event(&tx, event).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ApiError::upstream(SERVICE, e))).await;
                        return;
                    }
                }
            }
            if let Some(event) = decoder.finish() {
                forward_event(&tx, event).await;
            }
        });

        Ok(rx)
    }
}

/// Returns false once the stream should stop.
async fn forward_event(tx: &mpsc::Sender<Result<String, ApiError>>, event: SseEvent) -> bool {
    let SseEvent::Data(data) = event else {
        return false;
    };
    let chunk: Value = match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Skipping non-JSON stream line: {}", e);
            return true;
        }
    };
    match parse_stream_chunk(&chunk) {
        Ok(Some(text)) => tx.send(Ok(text)).await.is_ok(),
        Ok(None) => true,
        Err(err) => {
            let _ = tx.send(Err(err)).await;
            false
        }
    }
}

fn generation_body(request: &GenerationRequest) -> Value {
    json!({ "contents": request.messages })
}

/// Text carried by one streamed response chunk, or the error it reports.
pub(crate) fn parse_stream_chunk(chunk: &Value) -> Result<Option<String>, ApiError> {
    if let Some(message) = chunk.get("error").map(error_message_from_value) {
        return Err(ApiError::upstream(SERVICE, message));
    }

    let parts = chunk["candidates"][0]["content"]["parts"].as_array();
    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").map(error_message_from_value))
        .unwrap_or_else(|| body.trim().to_string())
}

fn error_message_from_value(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_chunk_concatenates_text_parts() {
        let chunk = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Max " }, { "text": "Verstappen" }] }
            }]
        });
        assert_eq!(
            parse_stream_chunk(&chunk).unwrap().as_deref(),
            Some("Max Verstappen")
        );
    }

    #[test]
    fn stream_chunk_without_text_is_skipped() {
        let chunk = json!({
            "candidates": [{ "finishReason": "STOP" }],
            "usageMetadata": { "totalTokenCount": 12 }
        });
        assert_eq!(parse_stream_chunk(&chunk).unwrap(), None);
    }

    #[test]
    fn stream_chunk_error_is_surfaced_with_message() {
        let chunk = json!({ "error": { "code": 429, "message": "Resource has been exhausted" } });
        let err = parse_stream_chunk(&chunk).unwrap_err();
        assert_eq!(err.client_message(), "Resource has been exhausted");
    }

    #[test]
    fn http_error_body_prefers_api_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message("  plain text  "), "plain text");
    }

    #[test]
    fn generation_body_carries_only_contents() {
        let body = generation_body(&GenerationRequest::from_prompt("What is DRS?"));
        assert_eq!(
            body,
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "What is DRS?" }] }] })
        );
    }

    #[test]
    fn model_urls_accept_prefixed_names() {
        let config = GeminiConfig {
            base_url: "https://example.test/v1beta/".into(),
            embedding_model: "models/text-embedding-004".into(),
            ..Default::default()
        };
        let provider = GeminiProvider::new(&config, "k".into());
        assert_eq!(
            provider.model_url(&provider.embedding_model, "embedContent"),
            "https://example.test/v1beta/models/text-embedding-004:embedContent"
        );
    }
}
