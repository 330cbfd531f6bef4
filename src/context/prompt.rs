use serde::{Deserialize, Serialize};

use crate::core::config::settings::DEFAULT_PERSONA;

/// Chunk texts retrieved for one question, closest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub chunks: Vec<String>,
}

impl RetrievedContext {
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// JSON array of the chunk texts; `[]` when nothing was retrieved.
    pub fn render(&self) -> String {
        serde_json::to_string(&self.chunks).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Builds the single generation prompt from context and question.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
}

impl PromptAssembler {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn assemble(&self, context: &RetrievedContext, question: &str) -> String {
        format!(
            "{} Context: {} Question: {}",
            self.persona.trim_end(),
            context.render(),
            question
        )
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_persona_context_and_question() {
        let assembler = PromptAssembler::new("You answer F1 questions.");
        let context = RetrievedContext::new(vec!["chunk A text".into(), "chunk B text".into()]);

        let prompt = assembler.assemble(&context, "Who won the 2023 F1 World Championship?");

        assert_eq!(
            prompt,
            r#"You answer F1 questions. Context: ["chunk A text","chunk B text"] Question: Who won the 2023 F1 World Championship?"#
        );
    }

    #[test]
    fn empty_context_renders_as_empty_array() {
        let prompt = PromptAssembler::default().assemble(&RetrievedContext::empty(), "What is DRS?");
        assert!(prompt.starts_with("You are a helpful assistant"));
        assert!(prompt.ends_with(" Context: [] Question: What is DRS?"));
    }

    #[test]
    fn context_text_is_json_escaped() {
        let context = RetrievedContext::new(vec![r#"He said "box, box""#.into()]);
        assert_eq!(context.render(), r#"["He said \"box, box\""]"#);
    }
}
