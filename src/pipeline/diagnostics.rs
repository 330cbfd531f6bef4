use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Validate,
    Embed,
    Retrieve,
    Generate,
    Respond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// the embedding response had no recognizable vector
    EmbeddingEmpty,
    /// the query vector length differs from the collection's dimension
    DimensionMismatch,
    /// the vector store call failed; the answer used no context
    RetrievalFailed,
    /// lower-ranked chunks were left out to fit the context budget
    ContextTruncated,
}

/// A degradation the pipeline recovered from, reported next to the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: PipelineStage,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: PipelineStage, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            stage,
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_tags() {
        let diagnostic = Diagnostic::new(
            PipelineStage::Retrieve,
            DiagnosticCode::RetrievalFailed,
            "connection refused",
        );
        assert_eq!(
            serde_json::to_value(&diagnostic).unwrap(),
            serde_json::json!({
                "stage": "retrieve",
                "code": "retrieval_failed",
                "message": "connection refused"
            })
        );
    }
}
