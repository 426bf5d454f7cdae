//! Reward history repository.

use std::sync::Arc;

use crate::entities::{RewardHistory, reward_history};
use punch_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

/// Reward history repository. Records are created by
/// [`crate::repositories::PunchCardRepository::redeem`] and never modified.
#[derive(Clone)]
pub struct RewardHistoryRepository {
    db: Arc<DatabaseConnection>,
}

impl RewardHistoryRepository {
    /// Create a new reward history repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Claimed rewards of a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<reward_history::Model>> {
        RewardHistory::find()
            .filter(reward_history::Column::UserId.eq(user_id))
            .order_by_desc(reward_history::Column::ClaimedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
