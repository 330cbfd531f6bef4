use thiserror::Error;

use crate::core::config::ConfigError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] ConfigError),

    #[error("Failed to initialize vector store: {0}")]
    VectorStore(#[source] ConfigError),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] ConfigError),
}
