pub mod embedding;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod sse;
pub mod types;


pub use embedding::{normalize_embedding, EmbeddingPayload};
pub use gemini::GeminiProvider;
pub use openai::OpenAiEmbeddingProvider;
pub use provider::{collect_fragments, EmbeddingProvider, FragmentStream, GenerationProvider};
pub use types::{ChatMessage, EmbeddingVector, GenerationRequest, MessagePart};
