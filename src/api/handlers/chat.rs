//! Chat handlers: conversational turns and stage analysis.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    ChatRequest, ChatResponse, ConversationStageRequest, ConversationStageResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /chat`: classify a message and answer with a search or analysis.
///
/// # Errors
///
/// Returns [`GatewayError`] for an empty message, invalid front-end
/// parameters, or upstream failure of the search or analysis that ran.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "Chat",
    summary = "Chat turn",
    description = "Classifies the message, extracts search parameters (LLM first, keyword rules as fallback), runs the matching search or analysis and returns a markdown reply. Pass the returned `search_params` and a `page` to fetch the next page.",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty message or invalid parameter", body = ErrorResponse),
        (status = 503, description = "Inventory unavailable", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let turn = req.into_turn()?;
    let reply = state
        .chat_service
        .respond(turn, Utc::now().timestamp_millis())
        .await?;
    Ok((StatusCode::OK, Json(ChatResponse::from(reply))))
}

/// `POST /conversation-stage`: where a conversation currently stands.
#[utoipa::path(
    post,
    path = "/api/v1/conversation-stage",
    tag = "Chat",
    summary = "Conversation stage",
    description = "Classifies a chat history as opening, exploring, clarifying, searching, recommending, deciding or closing. Uses the LLM when configured and the history has more than two messages, keyword rules otherwise.",
    request_body = ConversationStageRequest,
    responses(
        (status = 200, description = "Current stage", body = ConversationStageResponse),
    )
)]
pub async fn conversation_stage(
    State(state): State<AppState>,
    Json(req): Json<ConversationStageRequest>,
) -> impl IntoResponse {
    let stage = state
        .chat_service
        .conversation_stage(&req.chat_history)
        .await;
    (
        StatusCode::OK,
        Json(ConversationStageResponse {
            stage,
            timestamp: Utc::now(),
        }),
    )
}

/// Chat routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/conversation-stage", post(conversation_stage))
}
