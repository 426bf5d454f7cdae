//! Notifications endpoints.

use axum::{Json, Router, extract::State, routing::post};
use punch_common::AppResult;
use punch_db::entities::notification;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// List notifications request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    /// Maximum results (default: 10, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

const fn default_limit() -> u64 {
    10
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<Vec<notification::Model>>> {
    let notifications = state
        .notification_service
        .list(
            &user.id,
            req.limit.min(100),
            req.until_id.as_deref(),
            req.unread_only,
        )
        .await?;
    Ok(ApiResponse::ok(notifications))
}

/// Mark read request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_ids: Vec<String>,
}

/// Mark read response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub marked: u64,
    pub unread: u64,
}

async fn read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<ApiResponse<MarkReadResponse>> {
    let marked = state
        .notification_service
        .mark_as_read(&user.id, &req.notification_ids)
        .await?;
    let unread = state.notification_service.count_unread(&user.id).await?;
    Ok(ApiResponse::ok(MarkReadResponse { marked, unread }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list))
        .route("/read", post(read))
}
