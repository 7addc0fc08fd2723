use anyhow::{Context, Result, bail};
use dominicus::{config, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Installs the JSON subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(configured: &str) -> Result<String> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| configured.to_string());

    if level.parse::<LevelFilter>().is_err() {
        bail!("Invalid log level: '{level}'. Valid levels: error, warn, info, debug, trace");
    }

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level))?;
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    Ok(level)
}

#[tokio::main]
async fn main() -> Result<()> {
    // No subscriber yet, so configuration errors go straight to stderr.
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let level = match init_logging(&config.server.logs.level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    info!("Starting Dominicus with log level: {}", level);

    server::run(config).await.context("server stopped with an error")?;

    Ok(())
}
