use super::types::{AskRequest, AskResponse, ErrorResponse, HealthResponse, HistoryResponse};
use crate::{
    Error,
    error::BackendErrorKind,
    history::ConversationHistoryStore,
    translation::TranslationOrchestrator,
};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";

pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "How are you today?",
    "What's the weather like?",
    "Tell me a joke",
    "What's your favorite food?",
];

const GENERIC_FAILURE: &str = "Sorry, something went wrong processing your question.";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TranslationOrchestrator>,
    pub history: Arc<ConversationHistoryStore>,
}

pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Response {
    let session_id = session_id(&headers);
    info!("Received question for session: {}", session_id);

    let result = match state.orchestrator.translate(&request.question).await {
        Ok(result) => result,
        Err(Error::Validation(msg)) => {
            return with_session(
                &session_id,
                StatusCode::BAD_REQUEST,
                AskResponse::failed(format!("Invalid question: {msg}")),
            );
        }
        Err(e) => {
            error!(
                "Failed to process question for session {}: {}",
                session_id, e
            );
            return with_session(&session_id, status_for(&e), AskResponse::failed(GENERIC_FAILURE));
        }
    };

    match state
        .history
        .record(&session_id, request.question.trim(), &result)
        .await
    {
        Ok(entry) => {
            info!("Successfully answered question for session: {}", session_id);
            with_session(&session_id, StatusCode::OK, AskResponse::ok(entry))
        }
        Err(e) => {
            error!("Failed to record history for session {}: {}", session_id, e);
            with_session(
                &session_id,
                StatusCode::INTERNAL_SERVER_ERROR,
                AskResponse::failed(GENERIC_FAILURE),
            )
        }
    }
}

pub async fn history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = session_id(&headers);

    match state.history.load(&session_id).await {
        Ok(history) => with_session(
            &session_id,
            StatusCode::OK,
            HistoryResponse {
                session_id: session_id.clone(),
                entries: history.into_entries(),
            },
        ),
        Err(e) => {
            error!("Failed to load history for session {}: {}", session_id, e);
            with_session(
                &session_id,
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Could not load conversation history".to_string(),
                },
            )
        }
    }
}

pub async fn suggestions() -> Json<Vec<&'static str>> {
    Json(SUGGESTED_QUESTIONS.to_vec())
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.orchestrator.backend_name().to_string(),
    })
}

pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Backend(e) => match e.kind {
            BackendErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            BackendErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            BackendErrorKind::GenerationFailed => StatusCode::BAD_GATEWAY,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Session id from the request header, or a fresh one.
fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn with_session(session_id: &str, status: StatusCode, body: impl Serialize) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[test]
    fn test_status_for_errors() {
        assert_eq!(status_for(&Error::validation("blank")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&BackendError::unavailable("down").into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&BackendError::timeout("slow").into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&BackendError::generation_failed("empty").into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::internal("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_session_id_from_header_or_generated() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(session_id(&headers), "abc-123");

        let generated = session_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&generated).is_ok());
    }
}
