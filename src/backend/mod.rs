//! Inference backends.
//!
//! A backend is selected once at startup from configuration and shared as an
//! `Arc<dyn InferenceBackend>`. Callers never look at the concrete type; the
//! prompt shape a backend wants is part of the capability itself.

#[cfg(feature = "llama")]
mod llama;
mod local;
mod remote;

pub use local::{FragmentSource, Generation, LocalBackend, LocalModel, SamplingParams};
pub use remote::RemoteBackend;

use crate::{
    config::BackendConfig,
    error::BackendError,
    translation::{Completion, Prompt, PromptShape},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &str;

    fn prompt_shape(&self) -> PromptShape;

    async fn complete(&self, prompt: &Prompt) -> Result<Completion, BackendError>;
}

/// Builds the configured backend. Any failure here must stop the service from starting.
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn InferenceBackend>, BackendError> {
    let backend: Arc<dyn InferenceBackend> = match config {
        BackendConfig::Local(local) => Arc::new(LocalBackend::load(local.clone())?),
        BackendConfig::Remote(remote) => Arc::new(RemoteBackend::from_config(remote)?),
    };
    info!("Inference backend ready: {}", backend.name());
    Ok(backend)
}
