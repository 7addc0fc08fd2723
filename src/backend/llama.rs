use super::local::{FragmentSource, LocalModel, SamplingParams};
use crate::{config::LocalConfig, error::BackendError};
use encoding_rs::{Decoder, UTF_8};
use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use std::num::NonZeroU32;
use tracing::debug;

/// llama.cpp model plus one reusable context.
pub struct LlamaEngine {
    ctx: Option<LlamaContext<'static>>,
    model: Option<Box<LlamaModel>>,
    _backend: LlamaBackend,
}

// SAFETY: the context is only reached through `&mut self`, and `LocalBackend`
// keeps the engine behind a mutex, so it is never used from two threads at once.
unsafe impl Send for LlamaEngine {}

impl LlamaEngine {
    pub fn load(config: &LocalConfig) -> Result<Self, BackendError> {
        let backend = LlamaBackend::init().map_err(|e| {
            BackendError::unavailable(format!("Failed to initialise llama.cpp: {e}"))
        })?;

        let model_params = LlamaModelParams::default().with_n_gpu_layers(config.gpu_layers);
        let model = Box::new(
            LlamaModel::load_from_file(&backend, &config.model_path, &model_params).map_err(
                |e| {
                    BackendError::unavailable(format!(
                        "Failed to load model {}: {e}",
                        config.model_path.display()
                    ))
                },
            )?,
        );

        // The context borrows the model. The model is boxed so its address is
        // stable, and `Drop` releases the context before the model.
        let model_ptr: *const LlamaModel = &*model;
        // SAFETY: the box outlives the context; see `Drop`.
        let model_ref: &'static LlamaModel = unsafe { &*model_ptr };

        let ctx_params =
            LlamaContextParams::default().with_n_ctx(NonZeroU32::new(config.context_size));
        let ctx = model_ref.new_context(&backend, ctx_params).map_err(|e| {
            BackendError::unavailable(format!("Failed to create model context: {e}"))
        })?;

        Ok(Self {
            ctx: Some(ctx),
            model: Some(model),
            _backend: backend,
        })
    }
}

impl Drop for LlamaEngine {
    fn drop(&mut self) {
        let _ = self.ctx.take();
        let _ = self.model.take();
    }
}

impl LocalModel for LlamaEngine {
    fn start<'a>(
        &'a mut self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Box<dyn FragmentSource + 'a>, BackendError> {
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| BackendError::generation_failed("model context released"))?;
        ctx.clear_kv_cache();

        let model = ctx.model;
        // The instruction template already opens with `<s>`.
        let tokens = model
            .str_to_token(prompt, AddBos::Never)
            .map_err(|e| BackendError::generation_failed(format!("Failed to tokenize prompt: {e}")))?;
        if tokens.is_empty() {
            return Err(BackendError::generation_failed("empty prompt"));
        }

        let n_ctx = ctx.n_ctx() as usize;
        if tokens.len() + 1 >= n_ctx {
            return Err(BackendError::generation_failed(format!(
                "Prompt of {} tokens does not fit a context of {}",
                tokens.len(),
                n_ctx
            )));
        }
        let remaining = (params.max_tokens as usize).min(n_ctx - tokens.len() - 1);

        let n_batch = (ctx.n_batch() as usize).max(1);
        let last = tokens.len() - 1;
        for (chunk_index, chunk) in tokens.chunks(n_batch).enumerate() {
            let start = chunk_index * n_batch;
            let mut batch = LlamaBatch::new(chunk.len(), 1);
            for (offset, token) in chunk.iter().copied().enumerate() {
                let pos = start + offset;
                batch
                    .add(token, pos as i32, &[0], pos == last)
                    .map_err(|e| BackendError::generation_failed(format!("Failed to batch prompt: {e}")))?;
            }
            ctx.decode(&mut batch)
                .map_err(|e| BackendError::generation_failed(format!("Failed to decode prompt: {e}")))?;
        }
        debug!("Prompt decoded: {} tokens", tokens.len());

        let mut sampler = LlamaSampler::chain_simple(vec![
            LlamaSampler::penalties(64, params.repeat_penalty, 0.0, 0.0),
            LlamaSampler::temp(params.temperature),
            LlamaSampler::top_p(params.top_p, 1),
            if params.temperature <= 0.0 {
                LlamaSampler::greedy()
            } else {
                LlamaSampler::dist(params.seed)
            },
        ]);
        sampler.accept_many(&tokens);

        Ok(Box::new(LlamaStream {
            ctx,
            sampler,
            batch: LlamaBatch::new(1, 1),
            decoder: UTF_8.new_decoder(),
            n_cur: tokens.len() as i32,
            remaining,
            finished: false,
        }))
    }
}

struct LlamaStream<'a> {
    ctx: &'a mut LlamaContext<'static>,
    sampler: LlamaSampler,
    batch: LlamaBatch,
    decoder: Decoder,
    n_cur: i32,
    remaining: usize,
    finished: bool,
}

impl LlamaStream<'_> {
    /// Flushes bytes the decoder still holds from an incomplete UTF-8 sequence.
    fn finish(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }
        self.finished = true;

        let tail = decode_bytes(&mut self.decoder, &[], true);
        (!tail.is_empty()).then_some(tail)
    }
}

impl FragmentSource for LlamaStream<'_> {
    fn next_fragment(&mut self) -> Result<Option<String>, BackendError> {
        if self.finished || self.remaining == 0 {
            return Ok(self.finish());
        }

        let token = self.sampler.sample(&*self.ctx, -1);
        let model = self.ctx.model;
        if model.is_eog_token(token) {
            return Ok(self.finish());
        }

        let bytes = model
            .token_to_bytes(token, Special::Tokenize)
            .map_err(|e| BackendError::generation_failed(format!("Failed to detokenize: {e}")))?;
        let piece = decode_bytes(&mut self.decoder, &bytes, false);

        self.batch.clear();
        self.batch
            .add(token, self.n_cur, &[0], true)
            .map_err(|e| BackendError::generation_failed(format!("Failed to batch token: {e}")))?;
        self.n_cur += 1;
        self.remaining -= 1;
        self.ctx
            .decode(&mut self.batch)
            .map_err(|e| BackendError::generation_failed(format!("Failed to decode token: {e}")))?;

        Ok(Some(piece))
    }
}

/// Decodes token bytes, holding back an incomplete UTF-8 sequence until the
/// next call. With `last` set, held bytes are flushed as replacement text.
fn decode_bytes(decoder: &mut Decoder, bytes: &[u8], last: bool) -> String {
    let capacity = decoder
        .max_utf8_buffer_length(bytes.len())
        .unwrap_or(bytes.len() * 3 + 4);
    let mut piece = String::with_capacity(capacity);
    let _ = decoder.decode_to_string(bytes, &mut piece, last);
    piece
}
