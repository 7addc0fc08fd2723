use super::{
    parser::ResponseParser,
    prompt::PromptBuilder,
    types::{DialectStyle, PromptShape, TranslationResult},
};
use crate::{Error, Result, backend::InferenceBackend};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Turns a question into an English answer and a Dominican slang answer.
///
/// Backend errors are not retried here; they propagate to the caller.
pub struct TranslationOrchestrator {
    backend: Arc<dyn InferenceBackend>,
    prompts: PromptBuilder,
    parser: ResponseParser,
}

impl TranslationOrchestrator {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self::with_prompts(backend, PromptBuilder::default())
    }

    pub fn with_prompts(backend: Arc<dyn InferenceBackend>, prompts: PromptBuilder) -> Self {
        Self {
            backend,
            prompts,
            parser: ResponseParser,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn translate(&self, question: &str) -> Result<TranslationResult> {
        if question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }

        info!("Received translation request for question: {}", question);

        let result = match self.backend.prompt_shape() {
            PromptShape::SplitCall => self.translate_split(question).await,
            PromptShape::DualSegment => self.translate_dual(question).await,
        };

        match result {
            Ok(result) => {
                debug!(
                    "Translation complete: english {} chars, dominican {} chars",
                    result.english_response.len(),
                    result.dominican_response.len()
                );
                Ok(result)
            }
            Err(e) => {
                error!("Error generating response for question {:?}: {}", question, e);
                Err(e)
            }
        }
    }

    // Sequential: a backend instance is not assumed to take parallel calls.
    async fn translate_split(&self, question: &str) -> Result<TranslationResult> {
        debug!("Generating English response");
        let english_prompt = self.prompts.build(question, DialectStyle::English);
        let english = self.backend.complete(&english_prompt).await?;

        debug!("Generating Dominican response");
        let dominican_prompt = self.prompts.build(question, DialectStyle::Dominican);
        let dominican = self.backend.complete(&dominican_prompt).await?;

        Ok(TranslationResult::new(english, dominican))
    }

    async fn translate_dual(&self, question: &str) -> Result<TranslationResult> {
        let prompt = self.prompts.build_dual(question);
        let completion = self.backend.complete(&prompt).await?;
        Ok(self.parser.parse(&completion))
    }
}
