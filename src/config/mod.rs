mod types;

pub use types::*;

use crate::Result;
use std::env;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    let mut config = parse(&config_str)?;

    if let BackendConfig::Remote(ref mut remote) = config.backend {
        if remote.api_key.is_empty() {
            if let Ok(key) = env::var("LLM_API_KEY") {
                debug!("Using API key from LLM_API_KEY");
                remote.api_key = key;
            }
        }
    }

    Ok(config)
}

pub fn parse(yaml: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(yaml)?)
}
