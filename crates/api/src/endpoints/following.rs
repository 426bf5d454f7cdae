//! Following endpoints.

use axum::{Json, Router, extract::State, routing::post};
use punch_common::AppResult;
use punch_core::{Relationship, RequestResponse, social::FollowState};
use punch_db::entities::{follow_request, following};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Request naming another user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub user_id: String,
}

/// Follow result response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub state: FollowState,
}

/// Follow a user, or ask to if their profile is private.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let follow_state = state.following_service.follow(&user.id, &req.user_id).await?;
    Ok(ApiResponse::ok(FollowResponse {
        state: follow_state,
    }))
}

/// Unfollow a user, or withdraw a pending request.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let follow_state = state
        .following_service
        .unfollow(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(FollowResponse {
        state: follow_state,
    }))
}

/// Answer to a follow request.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Answer {
    Approve,
    Deny,
}

impl From<Answer> for RequestResponse {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Approve => Self::Approve,
            Answer::Deny => Self::Deny,
        }
    }
}

/// Respond request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    /// The requester
    pub user_id: String,
    pub answer: Answer,
}

/// Approve or deny a pending request addressed to the caller.
async fn respond(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RespondRequest>,
) -> AppResult<ApiResponse<FollowResponse>> {
    let follow_state = state
        .following_service
        .respond_to_request(&user.id, &req.user_id, req.answer.into())
        .await?;
    Ok(ApiResponse::ok(FollowResponse {
        state: follow_state,
    }))
}

/// List request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    30
}

/// Requests waiting on the caller.
async fn requests(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<follow_request::Model>>> {
    let pending = state
        .following_service
        .pending_requests(&user.id, req.limit.min(100))
        .await?;
    Ok(ApiResponse::ok(pending))
}

/// Edge list request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgesRequest {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

async fn followers(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EdgesRequest>,
) -> AppResult<ApiResponse<Vec<following::Model>>> {
    let edges = state
        .following_service
        .followers(
            viewer.user_id(),
            &req.user_id,
            req.limit.min(100),
            req.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(edges))
}

async fn following(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EdgesRequest>,
) -> AppResult<ApiResponse<Vec<following::Model>>> {
    let edges = state
        .following_service
        .following(
            viewer.user_id(),
            &req.user_id,
            req.limit.min(100),
            req.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(edges))
}

/// Both directions between the caller and another user.
async fn relationship(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FollowRequest>,
) -> AppResult<ApiResponse<Relationship>> {
    let relationship = state
        .following_service
        .relationship(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(relationship))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/delete", post(delete))
        .route("/requests/respond", post(respond))
        .route("/requests/list", post(requests))
        .route("/followers", post(followers))
        .route("/following", post(following))
        .route("/relationship", post(relationship))
}
