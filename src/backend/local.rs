use super::InferenceBackend;
use crate::{
    config::LocalConfig,
    error::BackendError,
    translation::{Completion, Prompt, PromptShape, render_instruction},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub seed: u32,
}

impl From<&LocalConfig> for SamplingParams {
    fn from(config: &LocalConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
            seed: config.seed,
        }
    }
}

/// Incremental decoder output of one generation, one fragment per sampled token.
pub trait FragmentSource {
    /// `Ok(None)` once the model reaches end of generation.
    fn next_fragment(&mut self) -> Result<Option<String>, BackendError>;
}

/// A loaded local model with its execution context.
///
/// `start` resets the context, so a model can only run one generation at a time.
pub trait LocalModel: Send {
    fn start<'a>(
        &'a mut self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Box<dyn FragmentSource + 'a>, BackendError>;
}

/// Bounded iterator over generated fragments.
///
/// Ends after `max_tokens` fragments, at end of generation, on the first error,
/// or right after a fragment completes an anti-prompt. Dropping it stops
/// generation.
pub struct Generation<'a> {
    source: Box<dyn FragmentSource + 'a>,
    anti_prompts: &'a [String],
    remaining: u32,
    window: String,
    window_len: usize,
    done: bool,
}

impl<'a> Generation<'a> {
    pub fn new(
        source: Box<dyn FragmentSource + 'a>,
        max_tokens: u32,
        anti_prompts: &'a [String],
    ) -> Self {
        let window_len = anti_prompts.iter().map(String::len).max().unwrap_or(0);
        Self {
            source,
            anti_prompts,
            remaining: max_tokens,
            window: String::new(),
            window_len,
            done: false,
        }
    }

    fn hit_anti_prompt(&self) -> bool {
        self.anti_prompts
            .iter()
            .any(|marker| !marker.is_empty() && self.window.contains(marker.as_str()))
    }

    // Keep just enough trailing text to spot a marker split across fragments.
    fn trim_window(&mut self) {
        if self.window.len() <= self.window_len {
            return;
        }
        let mut cut = self.window.len() - self.window_len;
        while !self.window.is_char_boundary(cut) {
            cut -= 1;
        }
        self.window.drain(..cut);
    }
}

impl Iterator for Generation<'_> {
    type Item = Result<String, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            self.done = true;
            return None;
        }

        match self.source.next_fragment() {
            Ok(Some(fragment)) => {
                self.remaining -= 1;
                self.window.push_str(&fragment);
                if self.hit_anti_prompt() {
                    self.done = true;
                }
                self.trim_window();
                Some(Ok(fragment))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Runs one generation to completion and assembles the completion text.
///
/// Whitespace-only fragments are dropped, the text is cut at the first
/// anti-prompt, and the result is trimmed.
pub(crate) fn generate(
    model: &mut dyn LocalModel,
    prompt: &str,
    params: &SamplingParams,
    anti_prompts: &[String],
) -> Result<Completion, BackendError> {
    debug!(
        "Starting local generation: prompt {} chars, max {} tokens",
        prompt.len(),
        params.max_tokens
    );

    let generation = Generation::new(model.start(prompt, params)?, params.max_tokens, anti_prompts);

    let mut output = String::new();
    let mut fragments = 0usize;
    for fragment in generation {
        let fragment = fragment.inspect_err(|e| {
            error!("Error during token generation after {} fragments: {}", fragments, e);
        })?;
        fragments += 1;
        if !fragment.trim().is_empty() {
            output.push_str(&fragment);
        }
    }

    let completion = cut_at_anti_prompt(&output, anti_prompts).trim().to_string();
    info!(
        "Completed local generation: {} fragments, {} chars",
        fragments,
        completion.len()
    );
    Ok(completion)
}

fn cut_at_anti_prompt<'t>(text: &'t str, anti_prompts: &[String]) -> &'t str {
    let end = anti_prompts
        .iter()
        .filter(|marker| !marker.is_empty())
        .filter_map(|marker| text.find(marker.as_str()))
        .min()
        .unwrap_or(text.len());
    &text[..end]
}

/// Backend running a model in-process.
///
/// The model sits behind a mutex: overlapping `complete` calls are serialised,
/// each running its generation on the blocking thread pool.
pub struct LocalBackend {
    model: Arc<Mutex<Box<dyn LocalModel>>>,
    config: Arc<LocalConfig>,
}

impl LocalBackend {
    /// Loads the configured model. Fails with `Unavailable` before doing any
    /// work if the model file does not exist.
    pub fn load(config: LocalConfig) -> Result<Self, BackendError> {
        info!("Model path: {}", config.model_path.display());

        if !config.model_path.is_file() {
            return Err(BackendError::unavailable(format!(
                "Model file not found at: {}",
                config.model_path.display()
            )));
        }

        info!(
            "Loading model with context size {} and {} GPU layers",
            config.context_size, config.gpu_layers
        );
        let model = load_engine(&config)?;
        info!("Model loaded successfully");

        Ok(Self::from_boxed(config, model))
    }

    pub fn with_model(config: LocalConfig, model: impl LocalModel + 'static) -> Self {
        Self::from_boxed(config, Box::new(model))
    }

    fn from_boxed(config: LocalConfig, model: Box<dyn LocalModel>) -> Self {
        Self {
            model: Arc::new(Mutex::new(model)),
            config: Arc::new(config),
        }
    }
}

#[cfg(feature = "llama")]
fn load_engine(config: &LocalConfig) -> Result<Box<dyn LocalModel>, BackendError> {
    Ok(Box::new(super::llama::LlamaEngine::load(config)?))
}

#[cfg(not(feature = "llama"))]
fn load_engine(_config: &LocalConfig) -> Result<Box<dyn LocalModel>, BackendError> {
    Err(BackendError::unavailable(
        "local inference requires building with the `llama` feature",
    ))
}

#[async_trait]
impl InferenceBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn prompt_shape(&self) -> PromptShape {
        PromptShape::SplitCall
    }

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, BackendError> {
        let (text, anti_prompts) = match prompt {
            Prompt::Instruction { text, anti_prompts } => (text.clone(), anti_prompts.clone()),
            Prompt::Chat { system, user } => (
                render_instruction(system, user),
                self.config.anti_prompts.clone(),
            ),
        };
        let params = SamplingParams::from(self.config.as_ref());
        let model = Arc::clone(&self.model);

        tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().map_err(|e| {
                BackendError::generation_failed(format!("Model lock poisoned: {e}"))
            })?;
            generate(&mut **guard, &text, &params, &anti_prompts)
        })
        .await
        .map_err(|e| BackendError::generation_failed(format!("Generation task failed: {e}")))?
    }
}
