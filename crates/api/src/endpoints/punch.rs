//! Punch card endpoints.

use axum::{Json, Router, extract::State, routing::post};
use punch_common::AppResult;
use punch_core::{CardView, PunchOutcome, Redemption, rewards::RewardStatus, tag::TagResolution};
use punch_db::entities::reward_history;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Scan request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub tag_id: String,
}

/// Record a punch for the restaurant bound to the scanned tag.
async fn scan(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> AppResult<ApiResponse<PunchOutcome>> {
    let outcome = state
        .punch_service
        .record_scan(&auth.session(), &req.tag_id)
        .await?;
    Ok(ApiResponse::ok(outcome))
}

/// Resolve request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub tag_id: String,
    /// Decoded text of the tag's NDEF record, if the reader got one
    pub payload_text: Option<String>,
}

/// Say what a tag points at without recording anything.
async fn resolve(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> AppResult<ApiResponse<TagResolution>> {
    let resolution = state
        .tag_resolver
        .resolve(&req.tag_id, req.payload_text.as_deref())
        .await?;
    Ok(ApiResponse::ok(resolution))
}

/// Request naming one restaurant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub restaurant_id: String,
}

async fn card(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CardRequest>,
) -> AppResult<ApiResponse<CardView>> {
    let card = state
        .punch_service
        .card(&auth.session(), &req.restaurant_id)
        .await?;
    Ok(ApiResponse::ok(card))
}

/// Every card the caller holds.
async fn wallet(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CardView>>> {
    let cards = state.punch_service.wallet(&auth.session()).await?;
    Ok(ApiResponse::ok(cards))
}

async fn rewards(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CardRequest>,
) -> AppResult<ApiResponse<Vec<RewardStatus>>> {
    let rewards = state
        .punch_service
        .rewards(&auth.session(), &req.restaurant_id)
        .await?;
    Ok(ApiResponse::ok(rewards))
}

/// Redeem request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub restaurant_id: String,
    /// Position of the reward in the restaurant's catalog
    pub reward_index: usize,
}

async fn redeem(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> AppResult<ApiResponse<Redemption>> {
    let redemption = state
        .punch_service
        .redeem(&auth.session(), &req.restaurant_id, req.reward_index)
        .await?;
    Ok(ApiResponse::ok(redemption))
}

/// History request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    20
}

async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> AppResult<ApiResponse<Vec<reward_history::Model>>> {
    let history = state
        .punch_service
        .history(&auth.session(), req.limit.min(100))
        .await?;
    Ok(ApiResponse::ok(history))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan))
        .route("/resolve", post(resolve))
        .route("/card", post(card))
        .route("/wallet", post(wallet))
        .route("/rewards", post(rewards))
        .route("/redeem", post(redeem))
        .route("/history", post(history))
}
