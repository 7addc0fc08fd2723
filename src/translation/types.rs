use serde::{Deserialize, Serialize};

/// The stylistic variant a prompt asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectStyle {
    English,
    Dominican,
}

/// How a backend wants its prompts shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptShape {
    /// One instruction-template prompt per dialect style, two backend calls.
    SplitCall,
    /// One chat prompt asking for both segments in a single completion.
    DualSegment,
}

/// Prompt text ready to hand to an inference backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// A fully rendered instruction template plus the markers that end generation.
    Instruction {
        text: String,
        anti_prompts: Vec<String>,
    },
    /// A system preamble and a single user message.
    Chat { system: String, user: String },
}

/// Raw text returned by a backend for one prompt.
pub type Completion = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub english_response: String,
    pub dominican_response: String,
}

impl TranslationResult {
    pub fn new(english: impl Into<String>, dominican: impl Into<String>) -> Self {
        Self {
            english_response: english.into(),
            dominican_response: dominican.into(),
        }
    }
}
