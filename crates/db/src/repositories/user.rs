//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
    sea_query::{Expr, LikeExpr, SimpleExpr},
};

/// `LIKE` pattern matching strings that start with `prefix` literally.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by exact (case-sensitive) username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search users whose username starts with `prefix` (case-sensitive).
    pub async fn search_by_username_prefix(
        &self,
        prefix: &str,
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(
                user::Column::Username.like(LikeExpr::new(prefix_pattern(prefix)).escape('\\')),
            )
            .order_by_asc(user::Column::Username)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Add one to the follower's following count and the followee's followers count.
pub(crate) async fn increment_follow_counts<C: ConnectionTrait>(
    conn: &C,
    follower_id: &str,
    followee_id: &str,
) -> AppResult<()> {
    update_count(
        conn,
        follower_id,
        user::Column::FollowingCount,
        Expr::col(user::Column::FollowingCount).add(1),
    )
    .await?;
    update_count(
        conn,
        followee_id,
        user::Column::FollowersCount,
        Expr::col(user::Column::FollowersCount).add(1),
    )
    .await
}

/// Take one from both counts, never below zero.
pub(crate) async fn decrement_follow_counts<C: ConnectionTrait>(
    conn: &C,
    follower_id: &str,
    followee_id: &str,
) -> AppResult<()> {
    update_count(
        conn,
        follower_id,
        user::Column::FollowingCount,
        Expr::cust("GREATEST(following_count - 1, 0)"),
    )
    .await?;
    update_count(
        conn,
        followee_id,
        user::Column::FollowersCount,
        Expr::cust("GREATEST(followers_count - 1, 0)"),
    )
    .await
}

async fn update_count<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    column: user::Column,
    value: SimpleExpr,
) -> AppResult<()> {
    User::update_many()
        .col_expr(column, value)
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}
