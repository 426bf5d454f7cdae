//! Restaurant like repository.

use std::sync::Arc;

use crate::entities::{RestaurantLike, restaurant_like};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Restaurant like repository for database operations.
#[derive(Clone)]
pub struct RestaurantLikeRepository {
    db: Arc<DatabaseConnection>,
}

impl RestaurantLikeRepository {
    /// Create a new restaurant like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check if a user likes a restaurant.
    pub async fn is_liked(&self, user_id: &str, restaurant_id: &str) -> AppResult<bool> {
        let found = RestaurantLike::find()
            .filter(restaurant_like::Column::UserId.eq(user_id))
            .filter(restaurant_like::Column::RestaurantId.eq(restaurant_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Create a like.
    pub async fn create(
        &self,
        model: restaurant_like::ActiveModel,
    ) -> AppResult<restaurant_like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a like. Returns whether a row was removed.
    pub async fn delete_by_pair(&self, user_id: &str, restaurant_id: &str) -> AppResult<bool> {
        let result = RestaurantLike::delete_many()
            .filter(restaurant_like::Column::UserId.eq(user_id))
            .filter(restaurant_like::Column::RestaurantId.eq(restaurant_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Restaurant IDs a user likes, most recent first.
    pub async fn find_restaurant_ids_by_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        let likes = RestaurantLike::find()
            .filter(restaurant_like::Column::UserId.eq(user_id))
            .order_by_desc(restaurant_like::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(likes.into_iter().map(|l| l.restaurant_id).collect())
    }
}
