pub mod handlers;
pub mod types;

use crate::{
    Result, backend,
    config::{BackendConfig, Config},
    history::{ConversationHistoryStore, SessionStorage},
    translation::{PromptBuilder, TranslationOrchestrator},
};
use axum::{
    Router,
    routing::{get, post},
};
use handlers::AppState;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ask", post(handlers::ask))
        .route("/api/history", get(handlers::history))
        .route("/api/suggestions", get(handlers::suggestions))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // Fatal if the backend cannot be built: the service must not come up without it.
    let backend = backend::from_config(&config.backend)?;
    let prompts = match &config.backend {
        BackendConfig::Local(local) => PromptBuilder::new(local.anti_prompts.clone()),
        BackendConfig::Remote(_) => PromptBuilder::default(),
    };

    let db_path =
        std::env::var("HISTORY_DB_PATH").unwrap_or_else(|_| config.server.database_path.clone());
    let storage = SessionStorage::new(&db_path).await?;

    let app_state = AppState {
        orchestrator: Arc::new(TranslationOrchestrator::with_prompts(backend, prompts)),
        history: Arc::new(ConversationHistoryStore::new(storage)),
    };

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(app_state)).await?;

    Ok(())
}
