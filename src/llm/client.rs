use super::types::*;
use crate::{config::RemoteConfig, error::BackendError};
use async_openai::{Client, config::OpenAIConfig, error::OpenAIError, types as openai_types};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Opaque RPC client for a hosted language model.
///
/// Implementations carry their own request/response pair per call, so one
/// instance can serve concurrent requests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn create_message(&self, request: MessageRequest)
    -> Result<MessageResponse, BackendError>;
}

/// Client for the Anthropic messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, BackendError> {
        if config.api_key.trim().is_empty() {
            return Err(BackendError::unavailable("Anthropic API key is not configured"));
        }

        let base_url = if config.base_url.is_empty() {
            ANTHROPIC_API_BASE.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn create_message(
        &self,
        request: MessageRequest,
    ) -> Result<MessageResponse, BackendError> {
        debug!(
            "Sending message request to {} with {} messages",
            request.model,
            request.messages.len()
        );

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let reply: MessageResponse = response.json().await.map_err(|e| {
            BackendError::generation_failed(format!("Failed to decode reply: {e}"))
        })?;

        debug!(
            "Received reply {} with {} content blocks",
            reply.id,
            reply.content.len()
        );
        Ok(reply)
    }
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = format!("API returned {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            BackendError::unavailable(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::timeout(message),
        s if s.is_server_error() => BackendError::unavailable(message),
        _ => BackendError::generation_failed(message),
    }
}

/// Client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, BackendError> {
        if config.api_key.trim().is_empty() {
            return Err(BackendError::unavailable("OpenAI API key is not configured"));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());

        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url.clone());
        }

        Ok(Self {
            client: Client::with_config(openai_config),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn create_message(
        &self,
        request: MessageRequest,
    ) -> Result<MessageResponse, BackendError> {
        debug!(
            "Creating chat completion with {} messages",
            request.messages.len()
        );

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            messages.push(ChatMessage::new("system", system).to_openai_message()?);
        }
        for msg in &request.messages {
            messages.push(msg.to_openai_message()?);
        }

        let openai_request = openai_types::CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(openai_error)?;

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(openai_error)?;

        debug!(
            "Received chat completion response with {} choices",
            response.choices.len()
        );

        let choice = response.choices.into_iter().next();
        let stop_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_ref())
            .map(|fr| format!("{fr:?}"));
        let content = choice
            .and_then(|c| c.message.content)
            .map(|text| vec![ContentBlock::Text { text }])
            .unwrap_or_default();

        Ok(MessageResponse {
            id: response.id,
            model: response.model,
            content,
            stop_reason,
            usage: response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

fn openai_error(e: OpenAIError) -> BackendError {
    match e {
        OpenAIError::Reqwest(e) => e.into(),
        OpenAIError::ApiError(e) => BackendError::unavailable(e.message),
        other => BackendError::generation_failed(other.to_string()),
    }
}
