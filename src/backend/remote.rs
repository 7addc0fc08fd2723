use super::InferenceBackend;
use crate::{
    config::{RemoteConfig, RemoteProvider},
    error::BackendError,
    llm::{AnthropicClient, ChatMessage, LlmClient, MessageRequest, OpenAiClient},
    translation::{Completion, Prompt, PromptShape},
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Backend calling a hosted model through one long-lived client.
///
/// Safe for concurrent use: every call is an independent request.
pub struct RemoteBackend {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl RemoteBackend {
    pub fn from_config(config: &RemoteConfig) -> Result<Self, BackendError> {
        let client: Arc<dyn LlmClient> = match config.provider {
            RemoteProvider::Anthropic => Arc::new(AnthropicClient::new(config)?),
            RemoteProvider::Openai => Arc::new(OpenAiClient::new(config)?),
        };
        Ok(Self::new(client, config))
    }

    pub fn new(client: Arc<dyn LlmClient>, config: &RemoteConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, prompt: &Prompt) -> MessageRequest {
        let (system, user) = match prompt {
            Prompt::Chat { system, user } => (Some(system.clone()), user.clone()),
            Prompt::Instruction { text, .. } => (None, text.clone()),
        };
        MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: vec![ChatMessage::user(user)],
        }
    }
}

#[async_trait]
impl InferenceBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    fn prompt_shape(&self) -> PromptShape {
        PromptShape::DualSegment
    }

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, BackendError> {
        debug!("Requesting completion from {}", self.model);

        let reply = match timeout(self.timeout, self.client.create_message(self.request(prompt))).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("No reply from {} within {:?}", self.model, self.timeout);
                return Err(BackendError::timeout(format!(
                    "No reply from {} within {:?}",
                    self.model, self.timeout
                )));
            }
        };

        reply
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| BackendError::generation_failed("Reply contained no text content"))
    }
}
