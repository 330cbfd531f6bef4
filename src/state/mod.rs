use std::sync::Arc;

use crate::context::{ContextBudget, PromptAssembler};
use crate::core::config::AppConfig;
use crate::llm::GeminiProvider;
use crate::pipeline::{PipelineSettings, QueryPipeline};
use crate::rag::AstraStore;

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
///
/// Providers and the store are built once at startup and reused across
/// requests; nothing here is mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<QueryPipeline>,
    pub collection: String,
}

impl AppState {
    /// Builds the query pipeline from a loaded configuration.
    ///
    /// Fails when the vector store connection or the Gemini API key is
    /// missing, naming the environment variable that should supply it.
    pub fn initialize(config: AppConfig) -> Result<Arc<Self>, InitializationError> {
        let connection = config
            .vector_store
            .connection()
            .map_err(InitializationError::VectorStore)?;
        let api_key = config
            .gemini
            .require_api_key()
            .map_err(InitializationError::Llm)?;

        let store = Arc::new(AstraStore::new(&connection));
        let gemini = Arc::new(
            GeminiProvider::new(&config.gemini, api_key)
                .with_output_dimensionality(config.vector_store.dimension),
        );

        let settings = PipelineSettings {
            top_k: config.vector_store.top_k,
            expected_dimension: Some(config.vector_store.dimension),
            budget: ContextBudget::new(config.prompt.max_context_tokens),
        };
        let pipeline = QueryPipeline::new(
            gemini.clone(),
            store,
            gemini,
            PromptAssembler::new(config.prompt.persona.clone()),
            settings,
        );

        tracing::info!(
            "Query pipeline ready (collection: {}, model: {}, top_k: {})",
            connection.collection,
            config.gemini.generation_model,
            config.vector_store.top_k
        );

        Ok(Self::from_parts(config, pipeline, connection.collection))
    }

    pub fn from_parts(
        config: AppConfig,
        pipeline: QueryPipeline,
        collection: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            collection: collection.into(),
        })
    }
}
