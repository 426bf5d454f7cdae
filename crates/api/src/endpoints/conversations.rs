//! Conversation endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use punch_common::AppResult;
use punch_core::conversation::Conversation;
use punch_db::repositories::MarkedRead;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse, sse};

/// The caller's conversations, newest activity first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<Conversation>>> {
    let conversations = state.conversation_service.list(&user.id).await?;
    Ok(ApiResponse::ok(conversations))
}

/// Mark read request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    /// The assistant id or the peer's user id
    pub conversation_id: String,
}

/// Mark every item of one conversation read.
async fn read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReadRequest>,
) -> AppResult<ApiResponse<MarkedRead>> {
    let marked = state
        .conversation_service
        .mark_as_read(&user.id, &req.conversation_id)
        .await?;
    Ok(ApiResponse::ok(marked))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/read", post(read))
        .route("/stream", get(sse::conversations_stream))
}
