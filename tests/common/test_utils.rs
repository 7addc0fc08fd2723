use super::mocks::MockBackend;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use dominicus::{
    config::{LocalConfig, RemoteConfig},
    history::{ConversationHistoryStore, SessionStorage},
    server::{self, handlers::AppState},
    translation::TranslationOrchestrator,
};
use serde_json::Value;
use std::sync::Arc;

/// Remote backend config pointing at `base_url`
pub fn create_remote_config(base_url: &str) -> RemoteConfig {
    RemoteConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        model: "claude-3-haiku-20240307".to_string(),
        max_tokens: 1000,
        temperature: 0.7,
        ..RemoteConfig::default()
    }
}

pub fn create_local_config() -> LocalConfig {
    LocalConfig {
        max_tokens: 64,
        ..LocalConfig::default()
    }
}

/// Router backed by `backend` and in-memory session storage
pub fn create_test_app(backend: Arc<MockBackend>) -> Router {
    let state = AppState {
        orchestrator: Arc::new(TranslationOrchestrator::new(backend)),
        history: Arc::new(ConversationHistoryStore::new(SessionStorage::in_memory())),
    };
    server::router(state)
}

pub fn json_request(method: &str, uri: &str, body: &Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sample configuration YAML for testing
pub const SAMPLE_CONFIG_YAML: &str = r#"
server:
  host: "127.0.0.1"
  port: 8080
  database_path: ":memory:"
  logs:
    level: "debug"
backend:
  type: remote
  provider: anthropic
  api_key: "test-api-key"
  model: "claude-3-haiku-20240307"
"#;
