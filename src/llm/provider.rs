use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{EmbeddingVector, GenerationRequest};
use crate::core::errors::ApiError;

/// Finite, single-use sequence of generated text fragments.
pub type FragmentStream = mpsc::Receiver<Result<String, ApiError>>;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// provider name used in logs (e.g. "gemini", "openai")
    fn name(&self) -> &str;

    /// embed one piece of text; unrecognized response shapes yield an empty vector
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ApiError>;
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// issue one generation request and hand back its fragment stream
    async fn generate(&self, request: GenerationRequest) -> Result<FragmentStream, ApiError>;
}

/// Drains a fragment stream into a single string, failing on the first error.
pub async fn collect_fragments(mut stream: FragmentStream) -> Result<String, ApiError> {
    let mut full = String::new();
    while let Some(fragment) = stream.recv().await {
        full.push_str(&fragment?);
    }
    Ok(full)
}
