//! Restaurant repository.

use std::sync::Arc;

use crate::entities::{Restaurant, restaurant};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};

/// Restaurant repository for database operations.
#[derive(Clone)]
pub struct RestaurantRepository {
    db: Arc<DatabaseConnection>,
}

impl RestaurantRepository {
    /// Create a new restaurant repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a restaurant by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<restaurant::Model>> {
        Restaurant::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a restaurant by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<restaurant::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(id.to_string()))
    }

    /// Find restaurants by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<restaurant::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Restaurant::find()
            .filter(restaurant::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the restaurant bound to an NFC tag (exact match).
    pub async fn find_by_tag(&self, tag_id: &str) -> AppResult<Option<restaurant::Model>> {
        Restaurant::find()
            .filter(restaurant::Column::NfcTagId.eq(tag_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All restaurants that have both coordinates.
    pub async fn find_located(&self) -> AppResult<Vec<restaurant::Model>> {
        Restaurant::find()
            .filter(restaurant::Column::Latitude.is_not_null())
            .filter(restaurant::Column::Longitude.is_not_null())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All restaurants, most liked first.
    pub async fn find_all(&self) -> AppResult<Vec<restaurant::Model>> {
        Restaurant::find()
            .order_by_desc(restaurant::Column::LikesCount)
            .order_by_asc(restaurant::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new restaurant.
    pub async fn create(&self, model: restaurant::ActiveModel) -> AppResult<restaurant::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a restaurant.
    pub async fn update(&self, model: restaurant::ActiveModel) -> AppResult<restaurant::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment views count atomically.
    pub async fn increment_views_count(&self, id: &str) -> AppResult<()> {
        Restaurant::update_many()
            .col_expr(
                restaurant::Column::ViewsCount,
                Expr::col(restaurant::Column::ViewsCount).add(1),
            )
            .filter(restaurant::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment likes count atomically.
    pub async fn increment_likes_count(&self, id: &str) -> AppResult<()> {
        Restaurant::update_many()
            .col_expr(
                restaurant::Column::LikesCount,
                Expr::col(restaurant::Column::LikesCount).add(1),
            )
            .filter(restaurant::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement likes count atomically, never below zero.
    pub async fn decrement_likes_count(&self, id: &str) -> AppResult<()> {
        Restaurant::update_many()
            .col_expr(
                restaurant::Column::LikesCount,
                Expr::cust("GREATEST(likes_count - 1, 0)"),
            )
            .filter(restaurant::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    pub fn create_test_restaurant(id: &str, tag: Option<&str>) -> restaurant::Model {
        restaurant::Model {
            id: id.to_string(),
            name: format!("Restaurant {id}"),
            latitude: Some(40.0),
            longitude: Some(-74.0),
            total: Some(10),
            active_rewards: json!([{"title": "Free Coffee", "description": "Any size"}]),
            nfc_tag_id: tag.map(ToString::to_string),
            logo_url: None,
            likes_count: 0,
            views_count: 0,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_tag() {
        let restaurant = create_test_restaurant("r1", Some("TAG-A"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[restaurant]])
                .into_connection(),
        );

        let repo = RestaurantRepository::new(db);
        let found = repo.find_by_tag("TAG-A").await.unwrap().unwrap();

        assert_eq!(found.id, "r1");
        assert_eq!(found.rewards().unwrap()[0].title, "Free Coffee");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<restaurant::Model>::new()])
                .into_connection(),
        );

        let repo = RestaurantRepository::new(db);
        match repo.get_by_id("nope").await {
            Err(AppError::RestaurantNotFound(id)) => assert_eq!(id, "nope"),
            _ => panic!("Expected RestaurantNotFound"),
        }
    }
}
