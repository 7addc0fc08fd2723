use super::types::{DialectStyle, Prompt};
use crate::config::default_anti_prompts;

pub const ENGLISH_MARKER: &str = "ENGLISH:";
pub const DOMINICAN_MARKER: &str = "DOMINICAN:";

const INSTRUCTION_PREAMBLE: &str = "You are a helpful AI assistant. Provide clear, concise, and accurate \
responses. When asked for a joke, tell a complete joke with a setup and punchline. When asked to respond \
in Dominican Spanish, use authentic Dominican Spanish slang, expressions, and cultural references, and \
sound natural and conversational, like a real Dominican person would speak.";

const DOMINICAN_SLANG: &[&str] = &[
    "tiguere", "jevi", "vaina", "klk", "dime", "que lo que", "diablo", "manin", "primo", "papi", "mami",
];

const DUAL_SEGMENT_PREAMBLE: &str = "You are a friendly and humorous Dominican AI assistant. When responding:
1. First give a clear English response
2. Then respond in authentic Dominican Spanish using:
   - Common Dominican slang like 'tiguere', 'jevi', 'vaina', 'klk', 'dime', 'que lo what'
   - Typical Dominican expressions like 'diablo', 'pero tipo', 'que fue', 'ta to bien'
   - Informal Dominican pronunciation (e.g., dropping 's' at end of words, using 'l' instead of 'r')
   - Add humor and warmth typical of Dominican culture
   - Use 'manin', 'primo', or 'tigueraje' for friendly addressing
Make it sound like a real Dominican person speaking casually with a friend.

Format your response exactly like this:
ENGLISH:
[your English response]
DOMINICAN:
[your Dominican Spanish response]";

/// Builds backend-specific prompts for a question.
///
/// The question is always carried as payload: in the instruction template it is
/// stripped of anything that reads as a template boundary, and in the chat shape
/// it travels as its own user message, apart from the format instructions.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    anti_prompts: Vec<String>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(default_anti_prompts())
    }
}

impl PromptBuilder {
    pub fn new(anti_prompts: Vec<String>) -> Self {
        Self { anti_prompts }
    }

    /// Split-call shape: one instruction prompt for a single dialect style.
    pub fn build(&self, question: &str, style: DialectStyle) -> Prompt {
        let question = self.sanitize(question.trim());
        let instruction = match style {
            DialectStyle::English => format!("Answer this question in English: {question}"),
            DialectStyle::Dominican => format!(
                "Respond to this question in authentic Dominican Spanish slang, using common \
                 Dominican expressions such as {}, and make it sound natural and conversational \
                 like a Dominican person would speak: {question}",
                quoted_list(DOMINICAN_SLANG)
            ),
        };

        Prompt::Instruction {
            text: render_instruction(INSTRUCTION_PREAMBLE, &instruction),
            anti_prompts: self.anti_prompts.clone(),
        }
    }

    /// Single-call shape: one chat prompt requesting both marked segments.
    pub fn build_dual(&self, question: &str) -> Prompt {
        Prompt::Chat {
            system: DUAL_SEGMENT_PREAMBLE.to_string(),
            user: question.trim().to_string(),
        }
    }

    fn sanitize(&self, question: &str) -> String {
        let markers: Vec<&str> = TEMPLATE_TOKENS
            .iter()
            .copied()
            .chain(self.anti_prompts.iter().map(String::as_str))
            .filter(|m| !m.is_empty())
            .collect();

        let mut cleaned = question.to_string();
        // Removing one marker can splice together another, so repeat until stable.
        loop {
            let Some(marker) = markers.iter().find(|m| cleaned.contains(**m)) else {
                return cleaned;
            };
            cleaned = cleaned.replace(*marker, "");
        }
    }
}

/// Tokens of the instruction template scaffold, stripped from every question
/// whatever the configured anti-prompts are.
const TEMPLATE_TOKENS: &[&str] = &["<<SYS>>", "<</SYS>>", "[INST]", "[/INST]", "<s>", "</s>"];

/// Llama-2 chat instruction template.
pub(crate) fn render_instruction(system: &str, instruction: &str) -> String {
    format!("<s>[INST] <<SYS>>\n{system}\n<</SYS>>\n\n{instruction} [/INST] ")
}

fn quoted_list(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| format!("'{w}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
