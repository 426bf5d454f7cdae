//! Conversation repository.
//!
//! Loads the raw items that make up a user's inbox and marks them read. The
//! aggregation into conversations happens in the core crate.

use std::{collections::HashSet, sync::Arc};

use crate::entities::{
    Message, Notification, message,
    notification::{self, NotificationType},
};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait, Value, prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};

/// Rows changed by marking a conversation read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MarkedRead {
    /// Notifications marked read.
    pub notifications: u64,
    /// Messages marked read.
    pub messages: u64,
}

/// Conversation repository for database operations.
#[derive(Clone)]
pub struct ConversationRepository {
    db: Arc<DatabaseConnection>,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Assistant-thread notifications that involve the viewer: those addressed
    /// to them and those they sent to the assistant.
    ///
    /// Loads the `window` most recent plus every one still unread by the
    /// viewer, newest first.
    pub async fn find_assistant_notifications(
        &self,
        viewer_id: &str,
        assistant_id: &str,
        window: u64,
    ) -> AppResult<Vec<notification::Model>> {
        let recent = Notification::find()
            .filter(notification::Column::NotificationType.is_in(NotificationType::ASSISTANT_THREAD))
            .filter(
                Condition::any()
                    .add(notification::Column::ToUserId.eq(viewer_id))
                    .add(
                        Condition::all()
                            .add(notification::Column::FromUserId.eq(viewer_id))
                            .add(notification::Column::ToUserId.eq(assistant_id)),
                    ),
            )
            .order_by_desc(notification::Column::CreatedAt)
            .limit(window)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let unread = Notification::find()
            .filter(notification::Column::NotificationType.is_in(NotificationType::ASSISTANT_THREAD))
            .filter(notification::Column::ToUserId.eq(viewer_id))
            .filter(notification::Column::FromUserId.ne(viewer_id))
            .filter(notification::Column::IsRead.eq(false))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(merge_newest_first(recent, unread, |n| (&n.id, n.created_at)))
    }

    /// Messages in the given chats: the `window` most recent of each chat
    /// plus every one still unread by the viewer, newest first.
    pub async fn find_messages(
        &self,
        viewer_id: &str,
        chat_ids: &[String],
        window: u64,
    ) -> AppResult<Vec<message::Model>> {
        if chat_ids.is_empty() {
            return Ok(vec![]);
        }

        let recent = Message::find()
            .from_raw_sql(recent_messages_statement(chat_ids, window))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let unread = Message::find()
            .filter(message::Column::ChatId.is_in(chat_ids.to_vec()))
            .filter(message::Column::FromUserId.ne(viewer_id))
            .filter(message::Column::IsRead.eq(false))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(merge_newest_first(recent, unread, |m| (&m.id, m.created_at)))
    }

    /// Mark every listed item read unless the viewer authored it.
    ///
    /// Both updates run in one transaction: either all items become read or
    /// none do.
    pub async fn mark_read(
        &self,
        viewer_id: &str,
        notification_ids: &[String],
        message_ids: &[String],
    ) -> AppResult<MarkedRead> {
        if notification_ids.is_empty() && message_ids.is_empty() {
            return Ok(MarkedRead::default());
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut marked = MarkedRead::default();

        if !notification_ids.is_empty() {
            marked.notifications = Notification::update_many()
                .col_expr(notification::Column::IsRead, Expr::value(true))
                .filter(notification::Column::Id.is_in(notification_ids.to_vec()))
                .filter(notification::Column::FromUserId.ne(viewer_id))
                .filter(notification::Column::IsRead.eq(false))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .rows_affected;
        }

        if !message_ids.is_empty() {
            marked.messages = Message::update_many()
                .col_expr(message::Column::IsRead, Expr::value(true))
                .filter(message::Column::Id.is_in(message_ids.to_vec()))
                .filter(message::Column::FromUserId.ne(viewer_id))
                .filter(message::Column::IsRead.eq(false))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .rows_affected;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(marked)
    }
}

/// Per-chat window over `message`, ranked by recency inside each chat.
fn recent_messages_statement(chat_ids: &[String], window: u64) -> Statement {
    let placeholders: Vec<String> = (1..=chat_ids.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        r#"SELECT id, chat_id, from_user_id, to_user_id, text, is_read, created_at
FROM (
    SELECT message.*,
           row_number() OVER (PARTITION BY chat_id ORDER BY created_at DESC) AS recency
    FROM message
    WHERE chat_id IN ({})
) AS ranked
WHERE recency <= ${}
ORDER BY created_at DESC"#,
        placeholders.join(", "),
        chat_ids.len() + 1
    );

    let mut values: Vec<Value> = chat_ids.iter().map(|id| id.as_str().into()).collect();
    values.push(i64::try_from(window).unwrap_or(i64::MAX).into());

    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// Union of two row sets, deduplicated by id, newest first.
fn merge_newest_first<T, F>(recent: Vec<T>, unread: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (&String, DateTimeWithTimeZone),
{
    let mut seen = HashSet::new();
    let mut rows: Vec<T> = recent
        .into_iter()
        .chain(unread)
        .filter(|row| seen.insert(key(row).0.clone()))
        .collect();
    rows.sort_by(|a, b| key(b).1.cmp(&key(a).1));
    rows
}
