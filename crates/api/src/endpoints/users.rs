//! User endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use punch_common::AppResult;
use punch_core::{
    UpdatePrivacyInput, UpdateProfileInput, UserProfile, services::user::MAX_SEARCH_RESULTS,
};
use punch_db::entities::user;
use serde::Deserialize;

use super::upload::Upload;
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Show user request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowUserRequest {
    pub user_id: String,
}

/// A profile trimmed to what the caller may see.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowUserRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    let profile = state
        .user_service
        .profile(viewer.user_id(), &req.user_id)
        .await?;
    Ok(ApiResponse::ok(profile))
}

/// Search users request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    MAX_SEARCH_RESULTS
}

/// Users whose username starts with the query.
async fn search(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SearchUsersRequest>,
) -> AppResult<ApiResponse<Vec<user::Model>>> {
    let users = state.user_service.search(&req.query, req.limit).await?;
    Ok(ApiResponse::ok(users))
}

/// Update the caller's name and bio.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<user::Model>> {
    let user = state.user_service.update_profile(&user.id, req).await?;
    Ok(ApiResponse::ok(user))
}

/// Update the caller's privacy settings.
async fn privacy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePrivacyInput>,
) -> AppResult<ApiResponse<user::Model>> {
    let user = state.user_service.update_privacy(&user.id, req).await?;
    Ok(ApiResponse::ok(user))
}

/// Replace the caller's avatar with the uploaded image.
async fn avatar(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<user::Model>> {
    let upload = Upload::read(multipart).await?;
    let user = state
        .user_service
        .set_avatar(&user.id, &upload.data, &upload.content_type)
        .await?;
    Ok(ApiResponse::ok(user))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/show", post(show))
        .route("/search", post(search))
        .route("/update", post(update))
        .route("/privacy", post(privacy))
        .route("/avatar", post(avatar))
}
