//! Direct message repository.

use std::sync::Arc;

use crate::entities::{Message, message};
use punch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Message repository for database operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new message.
    pub async fn create(&self, model: message::ActiveModel) -> AppResult<message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Messages in one chat (paginated, newest first).
    pub async fn find_by_chat(
        &self,
        chat_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        let mut query = Message::find()
            .filter(message::Column::ChatId.eq(chat_id))
            .order_by_desc(message::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(message::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All messages belonging to any of the given chats.
    pub async fn find_by_chat_ids(&self, chat_ids: &[String]) -> AppResult<Vec<message::Model>> {
        if chat_ids.is_empty() {
            return Ok(vec![]);
        }

        Message::find()
            .filter(message::Column::ChatId.is_in(chat_ids.to_vec()))
            .order_by_desc(message::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
