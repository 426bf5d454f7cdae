//! Restaurant endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use punch_common::AppResult;
use punch_core::{CreateRestaurantInput, NearbyRestaurant, geo::GeoPoint};
use punch_db::entities::restaurant;
use serde::{Deserialize, Serialize};

use super::upload::Upload;
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Request naming one restaurant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantIdRequest {
    pub restaurant_id: String,
}

/// A restaurant and whether the caller likes it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    #[serde(flatten)]
    pub restaurant: restaurant::Model,
    pub is_liked: bool,
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<RestaurantIdRequest>,
) -> AppResult<ApiResponse<RestaurantResponse>> {
    let restaurant = state.restaurant_service.get(&req.restaurant_id).await?;

    let is_liked = match viewer.user_id() {
        Some(user_id) => {
            state
                .restaurant_service
                .is_liked(user_id, &restaurant.id)
                .await?
        }
        None => false,
    };

    Ok(ApiResponse::ok(RestaurantResponse {
        restaurant,
        is_liked,
    }))
}

/// Nearby request. Without both coordinates every restaurant is listed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_miles: Option<f64>,
}

async fn nearby(
    State(state): State<AppState>,
    Json(req): Json<NearbyRequest>,
) -> AppResult<ApiResponse<Vec<NearbyRestaurant>>> {
    let origin = match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    };
    let radius = req
        .radius_miles
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(state.punch.nearby_radius_miles);

    let restaurants = state.restaurant_service.nearby(origin, radius).await?;
    Ok(ApiResponse::ok(restaurants))
}

async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RestaurantIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .restaurant_service
        .like(&user.id, &req.restaurant_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RestaurantIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .restaurant_service
        .unlike(&user.id, &req.restaurant_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Register a restaurant (admin only).
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateRestaurantInput>,
) -> AppResult<ApiResponse<restaurant::Model>> {
    let restaurant = state.restaurant_service.create(&user.id, req).await?;
    tracing::info!(restaurant_id = %restaurant.id, actor = %user.id, "Restaurant created");
    Ok(ApiResponse::ok(restaurant))
}

/// Bind tag request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindTagRequest {
    pub restaurant_id: String,
    pub tag_id: String,
}

/// A restaurant together with its bound tag, for the admin that bound it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundTagResponse {
    #[serde(flatten)]
    pub restaurant: restaurant::Model,
    pub nfc_tag_id: Option<String>,
}

/// Attach an NFC tag to a restaurant (admin only).
async fn bind_tag(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BindTagRequest>,
) -> AppResult<ApiResponse<BoundTagResponse>> {
    let restaurant = state
        .restaurant_service
        .bind_tag(&user.id, &req.restaurant_id, &req.tag_id)
        .await?;
    Ok(ApiResponse::ok(BoundTagResponse {
        nfc_tag_id: restaurant.nfc_tag_id.clone(),
        restaurant,
    }))
}

/// Upload a restaurant logo (admin only). Form fields: `restaurantId`, `file`.
async fn logo(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<ApiResponse<restaurant::Model>> {
    let upload = Upload::read(multipart).await?;
    let restaurant = state
        .restaurant_service
        .set_logo(
            &user.id,
            upload.field("restaurantId")?,
            &upload.data,
            &upload.content_type,
        )
        .await?;
    Ok(ApiResponse::ok(restaurant))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/show", post(show))
        .route("/nearby", post(nearby))
        .route("/like", post(like))
        .route("/unlike", post(unlike))
        .route("/create", post(create))
        .route("/bind-tag", post(bind_tag))
        .route("/logo", post(logo))
}
