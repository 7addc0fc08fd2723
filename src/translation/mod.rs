mod orchestrator;
mod parser;
mod prompt;
mod types;

pub use orchestrator::TranslationOrchestrator;
pub use parser::{ResponseParser, parse};
pub use prompt::{DOMINICAN_MARKER, ENGLISH_MARKER, PromptBuilder};
pub(crate) use prompt::render_instruction;
pub use types::*;
