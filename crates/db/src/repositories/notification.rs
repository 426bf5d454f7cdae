//! Notification repository.

use std::sync::Arc;

use crate::entities::{
    Notification,
    notification::{self, NotificationType, RequestStatus},
};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(
        &self,
        model: notification::ActiveModel,
    ) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Notifications addressed to a user (paginated, newest first).
    pub async fn find_by_recipient(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::ToUserId.eq(user_id))
            .order_by_desc(notification::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(notification::Column::Id.lt(id));
        }

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The most recent follow request notification from `from` to `to`, in any state.
    pub async fn find_follow_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        Notification::find()
            .filter(notification::Column::NotificationType.eq(NotificationType::FollowRequest))
            .filter(notification::Column::FromUserId.eq(from_user_id))
            .filter(notification::Column::ToUserId.eq(to_user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark the given notifications read if they are addressed to the user.
    pub async fn mark_as_read(&self, user_id: &str, ids: &[String]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.is_in(ids.to_vec()))
            .filter(notification::Column::ToUserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count unread notifications addressed to a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::ToUserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Move pending follow request notifications to a terminal status and mark them read.
pub(crate) async fn resolve_pending_request<C: ConnectionTrait>(
    conn: &C,
    from_user_id: &str,
    to_user_id: &str,
    status: RequestStatus,
) -> AppResult<u64> {
    let result = Notification::update_many()
        .col_expr(notification::Column::Status, Expr::value(status))
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::NotificationType.eq(NotificationType::FollowRequest))
        .filter(notification::Column::FromUserId.eq(from_user_id))
        .filter(notification::Column::ToUserId.eq(to_user_id))
        .filter(notification::Column::Status.eq(RequestStatus::Pending))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(result.rows_affected)
}

/// Delete pending follow request notifications (a withdrawn or superseded request).
pub(crate) async fn delete_pending_request<C: ConnectionTrait>(
    conn: &C,
    from_user_id: &str,
    to_user_id: &str,
) -> AppResult<u64> {
    let result = Notification::delete_many()
        .filter(notification::Column::NotificationType.eq(NotificationType::FollowRequest))
        .filter(notification::Column::FromUserId.eq(from_user_id))
        .filter(notification::Column::ToUserId.eq(to_user_id))
        .filter(notification::Column::Status.eq(RequestStatus::Pending))
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(result.rows_affected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(id: &str, status: Option<RequestStatus>) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            notification_type: NotificationType::FollowRequest,
            from_user_id: "user1".to_string(),
            to_user_id: "user2".to_string(),
            message: "user1 wants to follow you".to_string(),
            status,
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_follow_request() {
        let n = create_test_notification("n1", Some(RequestStatus::Approved));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let found = repo.find_follow_request("user1", "user2").await.unwrap().unwrap();

        assert_eq!(found.status, Some(RequestStatus::Approved));
    }

    #[tokio::test]
    async fn test_mark_as_read_empty_is_noop() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = NotificationRepository::new(db);
        assert_eq!(repo.mark_as_read("user2", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolve_follow_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let updated = resolve_pending_request(&db, "user1", "user2", RequestStatus::Denied)
            .await
            .unwrap();

        assert_eq!(updated, 1);
    }
}
