mod diagnostics;
mod query;
mod request;


pub use diagnostics::{Diagnostic, DiagnosticCode, PipelineStage};
pub use query::{PipelineOutcome, PipelineSettings, QueryPipeline, RETRIEVAL_FAILED_MESSAGE};
pub use request::{extract_latest_message, validate, MISSING_INPUT};
