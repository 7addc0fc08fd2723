use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub server: ServerConfig,
}

/// Which inference backend the service runs on. Selected once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Local(LocalConfig),
    Remote(RemoteConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_context_size")]
    pub context_size: u32,
    #[serde(default = "default_local_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,
    /// Layers offloaded to the GPU; 0 keeps inference on the CPU.
    #[serde(default)]
    pub gpu_layers: u32,
    #[serde(default = "default_anti_prompts")]
    pub anti_prompts: Vec<String>,
    #[serde(default = "default_seed")]
    pub seed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub provider: RemoteProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_remote_model")]
    pub model: String,
    #[serde(default = "default_remote_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteProvider {
    #[default]
    Anthropic,
    /// Any endpoint speaking the OpenAI chat-completions protocol.
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            context_size: default_context_size(),
            max_tokens: default_local_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            gpu_layers: 0,
            anti_prompts: default_anti_prompts(),
            seed: default_seed(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            provider: RemoteProvider::default(),
            api_key: String::new(),
            base_url: String::new(),
            model: default_remote_model(),
            max_tokens: default_remote_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("LLM").join("llama-2-7b-chat.Q4_K_M.gguf")
}

fn default_context_size() -> u32 {
    2048
}

fn default_local_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_repeat_penalty() -> f32 {
    1.1
}

pub fn default_anti_prompts() -> Vec<String> {
    ["<s>", "</s>", "[INST]", "[/INST]"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_seed() -> u32 {
    1234
}

fn default_remote_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}

fn default_remote_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> String {
    "history.db".to_string()
}
