use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::booking::{ChatTurn, EngineError};
use booking::models::{ChatRequest, ChatResponse, Language};
use chrono::Utc;
use tracing::warn;

use super::AppState;
use super::errors::{bad_request_response, store_error_response};
use super::observability::RequestContext;

const MAX_MESSAGE_CHARS: usize = 2_000;

pub(super) async fn chat(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(
                request_id = %context.request_id,
                "rejected chat payload: {rejection}"
            );
            return bad_request_response(
                "invalid_request",
                "Request body must be JSON with a message field",
            );
        }
    };

    if request.message.trim().is_empty() {
        return bad_request_response("invalid_message", "Message must not be empty");
    }
    if request.message.chars().count() > MAX_MESSAGE_CHARS {
        return bad_request_response("message_too_long", "Message is too long");
    }

    let turn = ChatTurn {
        message: &request.message,
        session_id: request.session_id.as_deref(),
        language: Language::from_tag(request.language.as_deref()),
    };

    match state.engine.handle_turn(turn, Utc::now()).await {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse::from(reply))).into_response(),
        Err(EngineError::EmptyMessage) => {
            bad_request_response("invalid_message", "Message must not be empty")
        }
        Err(EngineError::SessionStore(err)) => {
            warn!(request_id = %context.request_id, "chat turn failed on session store");
            store_error_response(err)
        }
    }
}
