//! Typed application settings.
//!
//! Every field has a default so a bare environment (only the required
//! secrets exported) is a complete configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::rag::SimilarityMetric;

pub const DEFAULT_PERSONA: &str = "You are a helpful assistant that helps users find information about Formula 1 based on the context provided. Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

pub const DEFAULT_SOURCES: [&str; 5] = [
    "https://en.wikipedia.org/wiki/Formula_One",
    "https://www.formula1.com/en/latest/all",
    "https://www.formula1.com/en/results.html",
    "https://www.formula1.com/en/teams.html",
    "https://www.formula1.com/en/drivers.html",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub vector_store: VectorStoreConfig,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
    pub prompt: PromptConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub namespace: Option<String>,
    pub collection: Option<String>,
    /// Fixed at collection creation; query vectors must match it.
    pub dimension: usize,
    pub metric: SimilarityMetric,
    pub top_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            namespace: None,
            collection: None,
            dimension: 768,
            metric: SimilarityMetric::DotProduct,
            top_k: 10,
        }
    }
}

/// Resolved connection parameters for the vector database.
#[derive(Debug, Clone)]
pub struct VectorStoreConnection {
    pub endpoint: String,
    pub token: String,
    pub namespace: String,
    pub collection: String,
}

impl VectorStoreConfig {
    pub fn connection(&self) -> Result<VectorStoreConnection, ConfigError> {
        Ok(VectorStoreConnection {
            endpoint: required(&self.endpoint, "ASTRA_DB_ENDPOINT")?,
            token: required(&self.token, "ASTRA_DB_TOKEN")?,
            namespace: required(&self.namespace, "ASTRA_DB_NAME")?,
            collection: required(&self.collection, "ASTRA_DB_COLLECTION")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            generation_model: "gemini-2.5-flash".to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        required(&self.api_key, "GEMINI_API")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        required(&self.api_key, "OPENAI_API")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub persona: String,
    /// Estimated-token budget for retrieved context; `0` disables the limit.
    pub max_context_tokens: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            max_context_tokens: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub sources: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            chunk_size: 512,
            chunk_overlap: 100,
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
}

fn required(value: &Option<String>, env_key: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(env_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.vector_store.top_k, 10);
        assert_eq!(config.vector_store.metric, SimilarityMetric::DotProduct);
        assert_eq!(config.ingest.chunk_size, 512);
        assert_eq!(config.ingest.chunk_overlap, 100);
        assert_eq!(config.ingest.sources.len(), 5);
        assert_eq!(config.gemini.generation_model, "gemini-2.5-flash");
    }

    #[test]
    fn connection_reports_first_missing_env_key() {
        let mut store = VectorStoreConfig {
            endpoint: Some("https://db.example".into()),
            token: Some("  ".into()),
            ..Default::default()
        };
        let err = store.connection().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ASTRA_DB_TOKEN")));

        store.token = Some("tok".into());
        store.namespace = Some("default_keyspace".into());
        store.collection = Some("f1gpt".into());
        let conn = store.connection().unwrap();
        assert_eq!(conn.collection, "f1gpt");
    }
}
