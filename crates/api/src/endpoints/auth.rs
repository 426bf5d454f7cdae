//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use punch_common::AppResult;
use punch_core::SignupInput;
use punch_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{middleware::AppState, response::ApiResponse};

/// Signup and signin response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl From<user::Model> for SessionResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            token: user.token,
        }
    }
}

/// Create a new user account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state.user_service.signup(req).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok(ApiResponse::ok(user.into()))
}

/// Signin request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Exchange credentials for the account's token.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let user = state
        .user_service
        .authenticate(&req.username, &req.password)
        .await?;

    Ok(ApiResponse::ok(user.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
}
