//! Restaurant service.

use std::sync::Arc;

use punch_common::{AppError, AppResult, IdGenerator, StorageBackend, logo_key};
use punch_db::{
    entities::{
        restaurant::{self, RewardDefinition},
        restaurant_like, user,
    },
    repositories::{RestaurantLikeRepository, RestaurantRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::geo::{DistanceResult, GeoPoint};

/// Restaurant service for business logic.
#[derive(Clone)]
pub struct RestaurantService {
    restaurant_repo: RestaurantRepository,
    like_repo: RestaurantLikeRepository,
    user_repo: UserRepository,
    storage: Option<Arc<dyn StorageBackend>>,
    id_gen: IdGenerator,
}

/// Input for creating a restaurant.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestaurantInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    #[validate(range(min = 1, max = 100))]
    pub total: Option<i32>,

    #[serde(default)]
    pub rewards: Vec<RewardDefinition>,
}

/// A restaurant with its distance from the caller, when known.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRestaurant {
    pub restaurant: restaurant::Model,
    pub distance: Option<DistanceResult>,
}

impl RestaurantService {
    /// Create a new restaurant service.
    #[must_use]
    pub const fn new(
        restaurant_repo: RestaurantRepository,
        like_repo: RestaurantLikeRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            restaurant_repo,
            like_repo,
            user_repo,
            storage: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the storage backend for logos.
    pub fn set_storage(&mut self, storage: Arc<dyn StorageBackend>) {
        self.storage = Some(storage);
    }

    /// Get a restaurant and count the view.
    pub async fn get(&self, id: &str) -> AppResult<restaurant::Model> {
        let restaurant = self.restaurant_repo.get_by_id(id).await?;

        if let Err(e) = self.restaurant_repo.increment_views_count(id).await {
            tracing::warn!(error = %e, restaurant_id = %id, "Failed to count restaurant view");
        }

        Ok(restaurant)
    }

    /// Restaurants around `origin`, nearest first, within `radius_miles`.
    ///
    /// Without an origin (location unavailable) every restaurant is returned
    /// in name order and without distances.
    pub async fn nearby(
        &self,
        origin: Option<GeoPoint>,
        radius_miles: f64,
    ) -> AppResult<Vec<NearbyRestaurant>> {
        let Some(origin) = origin else {
            let all = self.restaurant_repo.find_all().await?;
            return Ok(all
                .into_iter()
                .map(|restaurant| NearbyRestaurant {
                    restaurant,
                    distance: None,
                })
                .collect());
        };

        let mut nearby: Vec<NearbyRestaurant> = self
            .restaurant_repo
            .find_located()
            .await?
            .into_iter()
            .filter_map(|restaurant| {
                let (latitude, longitude) = restaurant.coordinates()?;
                let distance = origin.distance_to(&GeoPoint::new(latitude, longitude));
                (distance.miles <= radius_miles).then_some(NearbyRestaurant {
                    restaurant,
                    distance: Some(distance),
                })
            })
            .collect();

        nearby.sort_by(|a, b| {
            let a = a.distance.as_ref().map_or(f64::MAX, |d| d.miles);
            let b = b.distance.as_ref().map_or(f64::MAX, |d| d.miles);
            a.total_cmp(&b)
        });

        Ok(nearby)
    }

    /// Create a restaurant. Admin only.
    pub async fn create(
        &self,
        actor_id: &str,
        input: CreateRestaurantInput,
    ) -> AppResult<restaurant::Model> {
        input.validate()?;
        self.require_admin(actor_id).await?;

        if input.rewards.iter().any(|r| r.title.trim().is_empty()) {
            return Err(AppError::BadRequest("Reward title is required".to_string()));
        }

        let rewards = serde_json::to_value(&input.rewards)
            .map_err(|e| AppError::Internal(format!("Failed to encode rewards: {e}")))?;

        let model = restaurant::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            total: Set(input.total),
            active_rewards: Set(rewards),
            nfc_tag_id: Set(None),
            logo_url: Set(None),
            likes_count: Set(0),
            views_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        let restaurant = self.restaurant_repo.create(model).await?;
        tracing::info!(restaurant_id = %restaurant.id, "Restaurant created");
        Ok(restaurant)
    }

    /// Bind an NFC tag to a restaurant. Admin only.
    ///
    /// A tag identifies at most one restaurant; binding a tag that belongs to
    /// another restaurant fails with `Conflict`.
    pub async fn bind_tag(
        &self,
        actor_id: &str,
        restaurant_id: &str,
        tag_id: &str,
    ) -> AppResult<restaurant::Model> {
        self.require_admin(actor_id).await?;

        let tag_id = tag_id.trim();
        if tag_id.is_empty() {
            return Err(AppError::BadRequest("Tag id is required".to_string()));
        }

        let restaurant = self.restaurant_repo.get_by_id(restaurant_id).await?;

        if let Some(bound) = self.restaurant_repo.find_by_tag(tag_id).await? {
            if bound.id == restaurant_id {
                return Ok(restaurant);
            }
            return Err(AppError::Conflict(format!(
                "Tag {tag_id} is already bound to another restaurant"
            )));
        }

        let mut active: restaurant::ActiveModel = restaurant.into();
        active.nfc_tag_id = Set(Some(tag_id.to_string()));

        let restaurant = self.restaurant_repo.update(active).await?;
        tracing::info!(restaurant_id = %restaurant_id, tag_id = %tag_id, "Tag bound");
        Ok(restaurant)
    }

    /// Store a logo image for a restaurant. Admin only.
    pub async fn set_logo(
        &self,
        actor_id: &str,
        restaurant_id: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<restaurant::Model> {
        self.require_admin(actor_id).await?;

        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "Unsupported logo type: {content_type}"
            )));
        }

        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AppError::Config("Storage is not configured".to_string()))?;

        let restaurant = self.restaurant_repo.get_by_id(restaurant_id).await?;
        let key = logo_key(restaurant_id, &self.id_gen.generate(), content_type);
        let uploaded = storage.upload(&key, data, content_type).await?;

        let mut active: restaurant::ActiveModel = restaurant.into();
        active.logo_url = Set(Some(uploaded.url));

        self.restaurant_repo.update(active).await
    }

    /// Like a restaurant. Returns `false` if it was already liked.
    pub async fn like(&self, user_id: &str, restaurant_id: &str) -> AppResult<bool> {
        self.restaurant_repo.get_by_id(restaurant_id).await?;

        if self.like_repo.is_liked(user_id, restaurant_id).await? {
            return Ok(false);
        }

        let model = restaurant_like::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            restaurant_id: Set(restaurant_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.like_repo.create(model).await?;
        self.restaurant_repo
            .increment_likes_count(restaurant_id)
            .await?;

        Ok(true)
    }

    /// Remove a like. Returns `false` if there was none.
    pub async fn unlike(&self, user_id: &str, restaurant_id: &str) -> AppResult<bool> {
        if !self.like_repo.delete_by_pair(user_id, restaurant_id).await? {
            return Ok(false);
        }

        self.restaurant_repo
            .decrement_likes_count(restaurant_id)
            .await?;
        Ok(true)
    }

    /// Whether a user likes a restaurant.
    pub async fn is_liked(&self, user_id: &str, restaurant_id: &str) -> AppResult<bool> {
        self.like_repo.is_liked(user_id, restaurant_id).await
    }

    async fn require_admin(&self, actor_id: &str) -> AppResult<user::Model> {
        let actor = self.user_repo.get_by_id(actor_id).await?;
        if !actor.is_admin {
            return Err(AppError::Forbidden(
                "Only administrators can manage restaurants".to_string(),
            ));
        }
        Ok(actor)
    }
}
