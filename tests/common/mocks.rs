use async_trait::async_trait;
use dominicus::{
    backend::{FragmentSource, InferenceBackend, LocalModel, SamplingParams},
    error::BackendError,
    llm::{ContentBlock, LlmClient, MessageRequest, MessageResponse},
    translation::{Completion, Prompt, PromptShape},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock inference backend replaying scripted completions
#[derive(Debug)]
pub struct MockBackend {
    shape: PromptShape,
    pub responses: Mutex<VecDeque<Result<Completion, BackendError>>>,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl MockBackend {
    pub fn new(shape: PromptShape) -> Self {
        Self {
            shape,
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn dual(responses: Vec<Result<Completion, BackendError>>) -> Self {
        Self::new(PromptShape::DualSegment).with_responses(responses)
    }

    pub fn split(responses: Vec<Result<Completion, BackendError>>) -> Self {
        Self::new(PromptShape::SplitCall).with_responses(responses)
    }

    pub fn with_responses(self, responses: Vec<Result<Completion, BackendError>>) -> Self {
        *self.responses.lock().unwrap() = responses.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn get_prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn prompt_shape(&self) -> PromptShape {
        self.shape
    }

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, BackendError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::generation_failed("No more mock responses available")))
    }
}

/// Mock LLM client for testing
#[derive(Debug, Default)]
pub struct MockLlmClient {
    pub responses: Mutex<Vec<MessageResponse>>,
    pub requests: Mutex<Vec<MessageRequest>>,
    pub error: Option<BackendError>,
    pub delay: Option<Duration>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(self, responses: Vec<MessageResponse>) -> Self {
        *self.responses.lock().unwrap() = responses;
        self
    }

    pub fn with_error(mut self, error: BackendError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn create_message(
        &self,
        request: MessageRequest,
    ) -> Result<MessageResponse, BackendError> {
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(ref error) = self.error {
            return Err(error.clone());
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(BackendError::generation_failed("No more mock responses available"));
        }
        Ok(responses.remove(0))
    }
}

/// Local model that emits a fixed list of fragments for every prompt
pub struct ScriptedModel {
    fragments: Vec<String>,
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
    pub step_delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            prompts: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            step_delay: None,
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }
}

impl LocalModel for ScriptedModel {
    fn start<'a>(
        &'a mut self,
        prompt: &str,
        _params: &SamplingParams,
    ) -> Result<Box<dyn FragmentSource + 'a>, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(ScriptedSource {
            fragments: self.fragments.iter().cloned().collect(),
            active: Arc::clone(&self.active),
            step_delay: self.step_delay,
        }))
    }
}

struct ScriptedSource {
    fragments: VecDeque<String>,
    active: Arc<AtomicUsize>,
    step_delay: Option<Duration>,
}

impl FragmentSource for ScriptedSource {
    fn next_fragment(&mut self) -> Result<Option<String>, BackendError> {
        if let Some(delay) = self.step_delay {
            std::thread::sleep(delay);
        }
        Ok(self.fragments.pop_front())
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Local model whose decoder fails after the first fragment
pub struct FailingModel;

impl LocalModel for FailingModel {
    fn start<'a>(
        &'a mut self,
        _prompt: &str,
        _params: &SamplingParams,
    ) -> Result<Box<dyn FragmentSource + 'a>, BackendError> {
        Ok(Box::new(FailingSource { emitted: false }))
    }
}

struct FailingSource {
    emitted: bool,
}

impl FragmentSource for FailingSource {
    fn next_fragment(&mut self) -> Result<Option<String>, BackendError> {
        if self.emitted {
            return Err(BackendError::generation_failed("llama_decode failed"));
        }
        self.emitted = true;
        Ok(Some("Hello".to_string()))
    }
}

// Helper functions for creating test data

pub fn create_message_response(text: &str) -> MessageResponse {
    MessageResponse {
        id: "msg_test".to_string(),
        model: "test-model".to_string(),
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: Some("end_turn".to_string()),
        usage: None,
    }
}

pub fn create_empty_message_response() -> MessageResponse {
    MessageResponse {
        id: "msg_empty".to_string(),
        model: "test-model".to_string(),
        content: vec![ContentBlock::Other],
        stop_reason: Some("end_turn".to_string()),
        usage: None,
    }
}
