//! Punch card repository.
//!
//! Card counts are only changed through single conditional statements so that
//! concurrent scans can never push a card past its total or count twice.

use std::sync::Arc;

use crate::entities::{PunchCard, punch_card, reward_history};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Statement, TransactionTrait,
};

const INCREMENT_CAPPED_SQL: &str = r#"
INSERT INTO punch_card (id, user_id, restaurant_id, count, updated_at)
VALUES ($1, $2, $3, 1, now())
ON CONFLICT (user_id, restaurant_id) DO UPDATE
    SET count = punch_card.count + 1, updated_at = now()
    WHERE punch_card.count < $4
RETURNING count
"#;

const SPEND_SQL: &str = r#"
UPDATE punch_card
SET count = count - $3, updated_at = now()
WHERE user_id = $1 AND restaurant_id = $2 AND count >= $3
RETURNING count
"#;

/// Punch card repository for database operations.
#[derive(Clone)]
pub struct PunchCardRepository {
    db: Arc<DatabaseConnection>,
}

impl PunchCardRepository {
    /// Create a new punch card repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's card for a restaurant.
    pub async fn find(
        &self,
        user_id: &str,
        restaurant_id: &str,
    ) -> AppResult<Option<punch_card::Model>> {
        PunchCard::find()
            .filter(punch_card::Column::UserId.eq(user_id))
            .filter(punch_card::Column::RestaurantId.eq(restaurant_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Current punch count, zero when the user has no card yet.
    pub async fn count(&self, user_id: &str, restaurant_id: &str) -> AppResult<i32> {
        Ok(self
            .find(user_id, restaurant_id)
            .await?
            .map_or(0, |card| card.count))
    }

    /// All cards held by a user, most recently punched first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<punch_card::Model>> {
        PunchCard::find()
            .filter(punch_card::Column::UserId.eq(user_id))
            .order_by_desc(punch_card::Column::UpdatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add one punch unless the card already holds `total`.
    ///
    /// Creates the card on the first punch. Returns the new count, or `None`
    /// when the card was already full and nothing changed.
    pub async fn increment_capped(
        &self,
        card_id: &str,
        user_id: &str,
        restaurant_id: &str,
        total: i32,
    ) -> AppResult<Option<i32>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            INCREMENT_CAPPED_SQL,
            [
                card_id.into(),
                user_id.into(),
                restaurant_id.into(),
                total.into(),
            ],
        );

        let row = self
            .db
            .query_one(stmt)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(|r| r.try_get::<i32>("", "count"))
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Spend `required` punches and record the claim in one transaction.
    ///
    /// Returns `None` without writing anything when the card holds fewer than
    /// `required` punches.
    pub async fn redeem(
        &self,
        user_id: &str,
        restaurant_id: &str,
        required: i32,
        history: reward_history::ActiveModel,
    ) -> AppResult<Option<(i32, reward_history::Model)>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            SPEND_SQL,
            [user_id.into(), restaurant_id.into(), required.into()],
        );
        let row = txn
            .query_one(stmt)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = row else {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(None);
        };
        let remaining: i32 = row
            .try_get("", "count")
            .map_err(|e| AppError::Database(e.to_string()))?;

        let record = history
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some((remaining, record)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Set, Value};

    fn count_row(count: i32) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "count" => Value::Int(Some(count)) }
    }

    #[tokio::test]
    async fn test_increment_capped_returns_new_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(4)]])
                .into_connection(),
        );

        let repo = PunchCardRepository::new(db);
        let count = repo.increment_capped("c1", "u1", "r1", 10).await.unwrap();

        assert_eq!(count, Some(4));
    }

    #[tokio::test]
    async fn test_increment_capped_full_card() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );

        let repo = PunchCardRepository::new(db);
        let count = repo.increment_capped("c1", "u1", "r1", 10).await.unwrap();

        assert_eq!(count, None);
    }

    #[tokio::test]
    async fn test_count_without_card_is_zero() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<punch_card::Model>::new()])
                .into_connection(),
        );

        let repo = PunchCardRepository::new(db);
        assert_eq!(repo.count("u1", "r1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_redeem_records_history() {
        let record = reward_history::Model {
            id: "h1".to_string(),
            user_id: "u1".to_string(),
            restaurant_id: "r1".to_string(),
            reward_title: "Free Coffee".to_string(),
            punches_spent: 10,
            claimed_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[record.clone()]])
                .into_connection(),
        );

        let repo = PunchCardRepository::new(db);
        let history = reward_history::ActiveModel {
            id: Set(record.id.clone()),
            user_id: Set(record.user_id.clone()),
            restaurant_id: Set(record.restaurant_id.clone()),
            reward_title: Set(record.reward_title.clone()),
            punches_spent: Set(10),
            claimed_at: Set(record.claimed_at),
        };

        let (remaining, saved) = repo.redeem("u1", "r1", 10, history).await.unwrap().unwrap();

        assert_eq!(remaining, 0);
        assert_eq!(saved.reward_title, "Free Coffee");
    }
}
