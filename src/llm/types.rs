use serde::{Deserialize, Serialize};

/// Fixed-length embedding produced for a query or a document chunk.
pub type EmbeddingVector = Vec<f32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
}

/// A role-tagged message made of text parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![MessagePart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Single user turn carrying the whole prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(prompt)])
    }

    /// Text of the first part of the last message, if any.
    pub fn prompt_text(&self) -> Option<&str> {
        self.messages
            .last()
            .and_then(|m| m.parts.first())
            .map(|p| p.text.as_str())
    }
}
