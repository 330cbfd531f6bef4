use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::pipeline::Diagnostic;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// `POST /api/chat`
///
/// The body is parsed by hand so malformed JSON fails like any other
/// unexpected fault: a 500 carrying the parser's message.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        let payload: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::internal(format!("Invalid request body: {}", e)))?;

        let outcome = state.pipeline.handle(&payload).await?;
        tracing::info!(
            "Answered with {} context chunks ({} diagnostics)",
            outcome.context_chunks,
            outcome.diagnostics.len()
        );

        Ok::<_, ApiError>(Json(ChatResponse {
            response: outcome.answer,
            diagnostics: outcome.diagnostics,
        }))
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::context::PromptAssembler;
    use crate::core::config::AppConfig;
    use crate::llm::{
        EmbeddingProvider, EmbeddingVector, FragmentStream, GenerationProvider,
        GenerationRequest,
    };
    use crate::pipeline::{PipelineSettings, QueryPipeline};
    use crate::rag::{ChunkSearchResult, CollectionSpec, DocumentChunk, VectorStore};

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _text: &str) -> Result<EmbeddingVector, ApiError> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct FixedStore {
        fail: bool,
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn create_collection(&self, _spec: CollectionSpec) -> Result<(), ApiError> {
            Ok(())
        }

        async fn insert(&self, _chunk: DocumentChunk) -> Result<Option<String>, ApiError> {
            Ok(None)
        }

        async fn search(
            &self,
            _query_embedding: &[f32],
            _limit: usize,
        ) -> Result<Vec<ChunkSearchResult>, ApiError> {
            if self.fail {
                return Err(ApiError::upstream("astra", "connection refused"));
            }
            Ok(["chunk A text", "chunk B text"]
                .into_iter()
                .map(|text| ChunkSearchResult {
                    id: None,
                    text: text.to_string(),
                    score: None,
                })
                .collect())
        }
    }

    struct ScriptedGenerator {
        error: Option<&'static str>,
    }

    #[async_trait]
    impl GenerationProvider for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<FragmentStream, ApiError> {
            if let Some(message) = self.error {
                return Err(ApiError::upstream("gemini", message));
            }
            let (tx, rx) = mpsc::channel(4);
            for fragment in ["Max ", "Verstappen ", "won."] {
                tx.send(Ok(fragment.to_string())).await.unwrap();
            }
            Ok(rx)
        }
    }

    fn state(store_fails: bool, generation_error: Option<&'static str>) -> Arc<AppState> {
        let pipeline = QueryPipeline::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedStore { fail: store_fails }),
            Arc::new(ScriptedGenerator {
                error: generation_error,
            }),
            PromptAssembler::default(),
            PipelineSettings::default(),
        );
        AppState::from_parts(AppConfig::default(), pipeline, "f1gpt")
    }

    async fn call(state: Arc<AppState>, body: &str) -> (StatusCode, Value) {
        let response = chat(State(state), Bytes::from(body.to_string()))
            .await
            .into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn returns_generated_answer() {
        let (status, body) = call(
            state(false, None),
            r#"{"message": "Who won the 2023 F1 World Championship?"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "response": "Max Verstappen won." }));
    }

    #[tokio::test]
    async fn whitespace_message_is_answered() {
        let (status, body) = call(state(false, None), r#"{"message": "   "}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Max Verstappen won.");
    }

    #[tokio::test]
    async fn missing_message_is_bad_request() {
        let (status, body) = call(state(false, None), r#"{"messages": []}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No message provided" }));
    }

    #[tokio::test]
    async fn malformed_json_is_server_error_with_parse_message() {
        let (status, body) = call(state(false, None), "{not json").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body:"));
    }

    #[tokio::test]
    async fn store_failure_still_answers_with_diagnostic() {
        let (status, body) = call(state(true, None), r#"{"message": "What is DRS?"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Max Verstappen won.");
        assert_eq!(body["diagnostics"][0]["code"], "retrieval_failed");
        assert_eq!(body["diagnostics"][0]["stage"], "retrieve");
        assert!(!body["diagnostics"][0]["message"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn generation_failure_is_server_error_with_message() {
        let (status, body) = call(
            state(false, Some("model overloaded")),
            r#"{"message": "What is DRS?"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "model overloaded" }));
    }
}
