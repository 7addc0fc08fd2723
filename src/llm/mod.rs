mod client;
mod types;

pub use client::{AnthropicClient, LlmClient, OpenAiClient};
pub use types::*;
