//! Query pipeline: Validate → Embed → Retrieve → Generate → Respond.
//!
//! Embed and Generate faults end the request. Retrieve faults are recovered
//! locally: the answer is generated with an empty context and the failure
//! is reported as a diagnostic.

use std::sync::Arc;

use serde_json::Value;

use super::diagnostics::{Diagnostic, DiagnosticCode, PipelineStage};
use super::request;
use crate::context::{ContextBudget, PromptAssembler, RetrievedContext};
use crate::core::errors::ApiError;
use crate::llm::{collect_fragments, EmbeddingProvider, GenerationProvider, GenerationRequest};
use crate::rag::VectorStore;

/// Store errors stay in the logs; callers only learn that retrieval failed.
pub const RETRIEVAL_FAILED_MESSAGE: &str = "vector search failed; answered without context";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_k: usize,
    /// Collection dimensionality; query vectors of another length skip retrieval
    pub expected_dimension: Option<usize>,
    pub budget: ContextBudget,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            expected_dimension: None,
            budget: ContextBudget::unlimited(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub answer: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Chunks that made it into the prompt
    pub context_chunks: usize,
}

pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationProvider>,
    assembler: PromptAssembler,
    settings: PipelineSettings,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerationProvider>,
        assembler: PromptAssembler,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            assembler,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs every stage for a raw chat request body.
    pub async fn handle(&self, body: &Value) -> Result<PipelineOutcome, ApiError> {
        let question = request::validate(body)?;
        self.answer(&question).await
    }

    /// Runs Embed → Retrieve → Generate for an already validated question.
    pub async fn answer(&self, question: &str) -> Result<PipelineOutcome, ApiError> {
        let mut diagnostics = Vec::new();

        let vector = self.embedder.embed(question).await.map_err(|err| {
            tracing::error!("Embedding failed ({}): {}", self.embedder.name(), err);
            err
        })?;

        let context = match self.check_vector(&vector) {
            Ok(()) => self.retrieve(&vector, &mut diagnostics).await,
            Err(diagnostic) => {
                tracing::warn!("Skipping retrieval: {}", diagnostic.message);
                diagnostics.push(diagnostic);
                RetrievedContext::empty()
            }
        };

        let prompt = self.assembler.assemble(&context, question);
        tracing::debug!(
            "Prompt assembled ({} context chunks, {} chars)",
            context.chunks.len(),
            prompt.len()
        );

        let answer = self.generate(prompt).await.map_err(|err| {
            tracing::error!("Generation failed ({}): {}", self.generator.name(), err);
            err
        })?;

        Ok(PipelineOutcome {
            answer,
            diagnostics,
            context_chunks: context.chunks.len(),
        })
    }

    fn check_vector(&self, vector: &[f32]) -> Result<(), Diagnostic> {
        if vector.is_empty() {
            return Err(Diagnostic::new(
                PipelineStage::Embed,
                DiagnosticCode::EmbeddingEmpty,
                format!(
                    "{} returned no usable embedding; answering without context",
                    self.embedder.name()
                ),
            ));
        }
        if let Some(expected) = self.settings.expected_dimension {
            if vector.len() != expected {
                return Err(Diagnostic::new(
                    PipelineStage::Embed,
                    DiagnosticCode::DimensionMismatch,
                    format!(
                        "query embedding has {} dimensions, collection expects {}",
                        vector.len(),
                        expected
                    ),
                ));
            }
        }
        Ok(())
    }

    async fn retrieve(&self, vector: &[f32], diagnostics: &mut Vec<Diagnostic>) -> RetrievedContext {
        let results = match self.store.search(vector, self.settings.top_k).await {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(
                    "Vector search failed ({}), continuing without context: {}",
                    self.store.name(),
                    err
                );
                diagnostics.push(Diagnostic::new(
                    PipelineStage::Retrieve,
                    DiagnosticCode::RetrievalFailed,
                    RETRIEVAL_FAILED_MESSAGE,
                ));
                return RetrievedContext::empty();
            }
        };

        let texts = results.into_iter().map(|r| r.text).collect();
        let fitted = self.settings.budget.fit(texts);
        if fitted.dropped > 0 {
            tracing::warn!(
                "Dropped {} retrieved chunks to fit the {}-token context budget",
                fitted.dropped,
                self.settings.budget.max_tokens
            );
            diagnostics.push(Diagnostic::new(
                PipelineStage::Retrieve,
                DiagnosticCode::ContextTruncated,
                format!(
                    "{} lower-ranked chunks left out of the prompt",
                    fitted.dropped
                ),
            ));
        }

        RetrievedContext::new(fitted.chunks)
    }

    async fn generate(&self, prompt: String) -> Result<String, ApiError> {
        let stream = self
            .generator
            .generate(GenerationRequest::from_prompt(prompt))
            .await?;
        collect_fragments(stream).await
    }
}
