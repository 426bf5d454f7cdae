//! Messaging endpoints.

use axum::{Json, Router, extract::State, routing::post};
use punch_common::AppResult;
use punch_db::entities::{message, notification};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Send message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub user_id: String,
    pub text: String,
}

/// Send a direct message to a mutual follower.
async fn send(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> AppResult<ApiResponse<message::Model>> {
    let message = state
        .messaging_service
        .send(&user.id, &req.user_id, &req.text)
        .await?;
    Ok(ApiResponse::ok(message))
}

/// Thread request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRequest {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    50
}

/// Messages between the caller and another user, newest first.
async fn thread(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ThreadRequest>,
) -> AppResult<ApiResponse<Vec<message::Model>>> {
    let messages = state
        .messaging_service
        .thread(
            &user.id,
            &req.user_id,
            req.limit.min(100),
            req.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(messages))
}

/// Assistant message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub text: String,
}

/// Post into the assistant thread.
async fn assistant(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AssistantRequest>,
) -> AppResult<ApiResponse<notification::Model>> {
    let sent = state
        .messaging_service
        .send_to_assistant(&user.id, &req.text)
        .await?;
    Ok(ApiResponse::ok(sent))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(send))
        .route("/thread", post(thread))
        .route("/assistant", post(assistant))
}
