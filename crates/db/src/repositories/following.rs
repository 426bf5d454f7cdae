//! Following repository.

use std::sync::Arc;

use super::follow_request::claim;
use super::notification::{delete_pending_request, resolve_pending_request};
use super::user::{decrement_follow_counts, increment_follow_counts};
use crate::entities::{Following, following, notification::RequestStatus};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict, Query},
};

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a following relationship by follower and followee.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<following::Model>> {
        Following::find()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is following another user.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, followee_id).await?.is_some())
    }

    /// Follow in one transaction: insert the edge, bump both counters and
    /// drop any request left over from when the followee was private.
    ///
    /// Returns whether a new edge was created.
    pub async fn follow(&self, id: &str, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = insert_edge(&txn, id, follower_id, followee_id).await?;
        if claim(&txn, follower_id, followee_id).await? {
            delete_pending_request(&txn, follower_id, followee_id).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created)
    }

    /// Remove an edge and both counters in one transaction. Returns whether
    /// an edge was removed.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = Following::delete_many()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .rows_affected
            > 0;

        if !removed {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        decrement_follow_counts(&txn, follower_id, followee_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Approve a pending request: claim it, create the edge and resolve the
    /// request notification, all in one transaction.
    ///
    /// An edge that already exists counts as created. Returns `false`,
    /// writing nothing, when no request was pending.
    pub async fn accept_request(
        &self,
        id: &str,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<bool> {
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

        insert_edge(&txn, id, follower_id, followee_id).await?;
        resolve_pending_request(&txn, follower_id, followee_id, RequestStatus::Approved).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Get users that a user is following (paginated).
    pub async fn find_following(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        let mut query = Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .order_by_desc(following::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(following::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get users that are following a user (paginated).
    pub async fn find_followers(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        let mut query = Following::find()
            .filter(following::Column::FolloweeId.eq(user_id))
            .order_by_desc(following::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(following::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of users who follow `user_id` and are followed back, oldest edge first.
    pub async fn find_mutual_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let followers = Query::select()
            .column(following::Column::FollowerId)
            .from(Following)
            .and_where(Expr::col(following::Column::FolloweeId).eq(user_id))
            .to_owned();

        let edges = Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .filter(following::Column::FolloweeId.in_subquery(followers))
            .order_by_asc(following::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(edges.into_iter().map(|f| f.followee_id).collect())
    }

    /// Whether both users follow each other.
    pub async fn is_mutual(&self, a: &str, b: &str) -> AppResult<bool> {
        Ok(self.is_following(a, b).await? && self.is_following(b, a).await?)
    }
}

/// Insert an edge unless the pair already has one, then bump both counters.
async fn insert_edge<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    follower_id: &str,
    followee_id: &str,
) -> AppResult<bool> {
    let model = following::ActiveModel {
        id: Set(id.to_string()),
        follower_id: Set(follower_id.to_string()),
        followee_id: Set(followee_id.to_string()),
        created_at: Set(chrono::Utc::now().into()),
    };

    let inserted = Following::insert(model)
        .on_conflict(
            OnConflict::columns([following::Column::FollowerId, following::Column::FolloweeId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if inserted == 0 {
        return Ok(false);
    }

    increment_follow_counts(conn, follower_id, followee_id).await?;
    Ok(true)
}
