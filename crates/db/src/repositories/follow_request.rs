//! Follow request repository.

use std::sync::Arc;

use super::notification::{delete_pending_request, resolve_pending_request};
use crate::entities::{FollowRequest, follow_request, notification::RequestStatus};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};

/// Follow request repository for database operations.
#[derive(Clone)]
pub struct FollowRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRequestRepository {
    /// Create a new follow request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a pending request by follower and followee.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<follow_request::Model>> {
        FollowRequest::find()
            .filter(follow_request::Column::FollowerId.eq(follower_id))
            .filter(follow_request::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a request is pending.
    pub async fn is_pending(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, followee_id).await?.is_some())
    }

    /// Create a new follow request.
    pub async fn create(
        &self,
        model: follow_request::ActiveModel,
    ) -> AppResult<follow_request::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Withdraw a pending request together with its notification.
    /// Returns whether a request was pending.
    pub async fn withdraw(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let withdrawn = claim(&txn, follower_id, followee_id).await?;
        if withdrawn {
            delete_pending_request(&txn, follower_id, followee_id).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(withdrawn)
    }

    /// Deny a pending request and resolve its notification in one transaction.
    ///
    /// Returns `false`, writing nothing, when no request was pending.
    pub async fn deny(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !claim(&txn, follower_id, followee_id).await? {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        resolve_pending_request(&txn, follower_id, followee_id, RequestStatus::Denied).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Requests waiting on a user's approval, newest first.
    pub async fn find_by_followee(
        &self,
        followee_id: &str,
        limit: u64,
    ) -> AppResult<Vec<follow_request::Model>> {
        FollowRequest::find()
            .filter(follow_request::Column::FolloweeId.eq(followee_id))
            .order_by_desc(follow_request::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Remove a pending request. Returns whether this call removed it.
///
/// Deleting is how a response claims the request: of two concurrent
/// responders only one sees `true`.
pub(crate) async fn claim<C: ConnectionTrait>(
    conn: &C,
    follower_id: &str,
    followee_id: &str,
) -> AppResult<bool> {
    let result = FollowRequest::delete_many()
        .filter(follow_request::Column::FollowerId.eq(follower_id))
        .filter(follow_request::Column::FolloweeId.eq(followee_id))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_is_pending() {
        let request = follow_request::Model {
            id: "fr1".to_string(),
            follower_id: "user1".to_string(),
            followee_id: "user2".to_string(),
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[request]])
                .into_connection(),
        );

        let repo = FollowRequestRepository::new(db);
        assert!(repo.is_pending("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_claim_fails() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = FollowRequestRepository::new(db);
        assert!(repo.deny("user1", "user2").await.unwrap());
        assert!(!repo.deny("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_withdraw_removes_notification() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = FollowRequestRepository::new(db.clone());
        assert!(repo.withdraw("user1", "user2").await.unwrap());
        drop(repo);

        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(format!("{log:?}").matches("DELETE FROM").count(), 2);
    }
}
