pub mod prompt;
pub mod window;

pub use prompt::{PromptAssembler, RetrievedContext};
pub use window::{ContextBudget, FittedContext};
