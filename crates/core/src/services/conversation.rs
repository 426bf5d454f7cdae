//! Conversation service.
//!
//! Loads the viewer's inbox rows, with bounded retry since every load is a
//! plain read, and hands them to the aggregator. Each conversation carries
//! its most recent items plus everything still unread; the full history of
//! a chat is paged through the messaging service.

use punch_common::{AppError, AppResult, RetryPolicy};
use punch_db::repositories::{ConversationRepository, FollowingRepository, MarkedRead};

use crate::conversation::{Conversation, InboxSources, build_conversations, chat_id};
use crate::services::event_publisher::{EventPublisherService, StreamEvent};

/// Conversation service for business logic.
#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: ConversationRepository,
    following_repo: FollowingRepository,
    event_publisher: Option<EventPublisherService>,
    retry: RetryPolicy,
    assistant_id: String,
    placeholder: String,
    window: u64,
}

/// Recent items per conversation when no window is configured.
pub const DEFAULT_INBOX_WINDOW: u64 = 50;

impl ConversationService {
    /// Create a new conversation service.
    #[must_use]
    pub fn new(
        conversation_repo: ConversationRepository,
        following_repo: FollowingRepository,
        retry: RetryPolicy,
        assistant_id: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            conversation_repo,
            following_repo,
            event_publisher: None,
            retry,
            assistant_id: assistant_id.into(),
            placeholder: placeholder.into(),
            window: DEFAULT_INBOX_WINDOW,
        }
    }

    /// Load at most `window` recent items per conversation, plus unread ones.
    #[must_use]
    pub const fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// The viewer's conversations, most recent first.
    pub async fn list(&self, viewer_id: &str) -> AppResult<Vec<Conversation>> {
        let notifications = self
            .retry
            .run("load assistant notifications", || {
                self.conversation_repo.find_assistant_notifications(
                    viewer_id,
                    &self.assistant_id,
                    self.window,
                )
            })
            .await?;

        let mutual_follows = self
            .retry
            .run("load mutual follows", || {
                self.following_repo.find_mutual_ids(viewer_id)
            })
            .await?;

        let chat_ids: Vec<String> = mutual_follows
            .iter()
            .filter(|peer| peer.as_str() != viewer_id)
            .map(|peer| chat_id(viewer_id, peer))
            .collect();

        let messages = self
            .retry
            .run("load direct messages", || {
                self.conversation_repo
                    .find_messages(viewer_id, &chat_ids, self.window)
            })
            .await?;

        Ok(build_conversations(
            viewer_id,
            &self.assistant_id,
            InboxSources {
                notifications: &notifications,
                messages: &messages,
                mutual_follows: &mutual_follows,
            },
            &self.placeholder,
        ))
    }

    /// One conversation of the viewer's.
    pub async fn get(&self, viewer_id: &str, conversation_id: &str) -> AppResult<Conversation> {
        self.list(viewer_id)
            .await?
            .into_iter()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id}")))
    }

    /// Mark every item the viewer did not author in a conversation as read.
    ///
    /// All items change in one transaction.
    pub async fn mark_as_read(
        &self,
        viewer_id: &str,
        conversation_id: &str,
    ) -> AppResult<MarkedRead> {
        let conversation = self.get(viewer_id, conversation_id).await?;
        let (notification_ids, message_ids) = conversation.unread_item_ids(viewer_id);

        let marked = self
            .conversation_repo
            .mark_read(viewer_id, &notification_ids, &message_ids)
            .await?;

        if marked != MarkedRead::default() {
            tracing::debug!(
                viewer_id = %viewer_id,
                conversation_id = %conversation_id,
                notifications = marked.notifications,
                messages = marked.messages,
                "Conversation marked read"
            );

            if let Some(ref event_publisher) = self.event_publisher
                && let Err(e) = event_publisher
                    .publish(StreamEvent::ConversationRead {
                        user_id: viewer_id.to_string(),
                    })
                    .await
            {
                tracing::warn!(error = %e, "Failed to publish read event");
            }
        }

        Ok(marked)
    }

    /// Unread items across all of the viewer's conversations.
    pub async fn unread_total(&self, viewer_id: &str) -> AppResult<usize> {
        Ok(self
            .list(viewer_id)
            .await?
            .iter()
            .map(|c| c.unread_count)
            .sum())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::conversation::ConversationKind;
    use crate::testing::{create_test_message, create_test_notification};
    use punch_db::entities::{following, notification, notification::NotificationType};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_service(
        conversation_db: DatabaseConnection,
        following_db: DatabaseConnection,
    ) -> ConversationService {
        ConversationService::new(
            ConversationRepository::new(Arc::new(conversation_db)),
            FollowingRepository::new(Arc::new(following_db)),
            RetryPolicy::none(),
            "puncho",
            "Say hi 👋",
        )
    }

    fn no_notifications() -> [Vec<notification::Model>; 2] {
        [Vec::new(), Vec::new()]
    }

    fn edge(follower: &str, followee: &str) -> following::Model {
        following::Model {
            id: format!("{follower}-{followee}"),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_single_unread_assistant_notification() {
        let intro = create_test_notification("n1", NotificationType::PunchoIntro, "puncho", "u1", 1);
        let conversation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[intro.clone()], [intro]])
            .into_connection();
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<following::Model>::new()])
            .into_connection();

        let conversations = create_test_service(conversation_db, following_db)
            .list("u1")
            .await
            .unwrap();

        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].kind, ConversationKind::Assistant);
        assert!(conversations[0].unread);
    }

    #[tokio::test]
    async fn test_list_includes_direct_threads() {
        let incoming = create_test_message("m1", "u2", "u1", "hey", 3);
        let conversation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(no_notifications())
            .append_query_results([[incoming.clone()], [incoming]])
            .into_connection();
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[edge("u1", "u2"), edge("u1", "u3")]])
            .into_connection();

        let conversations = create_test_service(conversation_db, following_db)
            .list("u1")
            .await
            .unwrap();

        let ids: Vec<&str> = conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u3"]);
        assert_eq!(conversations[0].last_message, "hey");
        assert_eq!(conversations[1].last_message, "Say hi 👋");
    }

    #[tokio::test]
    async fn test_mark_as_read_unknown_conversation() {
        let conversation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(no_notifications())
            .into_connection();
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<following::Model>::new()])
            .into_connection();

        let result = create_test_service(conversation_db, following_db)
            .mark_as_read("u1", "nobody")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_as_read_marks_peer_messages() {
        let incoming = create_test_message("m1", "u2", "u1", "hey", 3);
        let outgoing = create_test_message("m2", "u1", "u2", "yo", 2);

        let conversation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(no_notifications())
            .append_query_results([vec![outgoing, incoming.clone()], vec![incoming]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[edge("u1", "u2")]])
            .into_connection();

        let marked = create_test_service(conversation_db, following_db)
            .mark_as_read("u1", "u2")
            .await
            .unwrap();

        assert_eq!(marked.messages, 1);
        assert_eq!(marked.notifications, 0);
    }

    #[tokio::test]
    async fn test_unread_outside_window_still_counts() {
        let recent = create_test_message("m9", "u1", "u2", "latest", 1);
        let old_unread = create_test_message("m1", "u2", "u1", "way back", 500);

        let conversation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(no_notifications())
            .append_query_results([vec![recent], vec![old_unread]])
            .into_connection();
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[edge("u1", "u2")]])
            .into_connection();

        let conversations = create_test_service(conversation_db, following_db)
            .with_window(1)
            .list("u1")
            .await
            .unwrap();

        assert_eq!(conversations[0].last_message, "latest");
        assert_eq!(conversations[0].messages.len(), 2);
        assert!(conversations[0].unread);
        assert_eq!(conversations[0].unread_count, 1);
    }

    #[tokio::test]
    async fn test_unread_total() {
        let intro = create_test_notification("n1", NotificationType::PunchoIntro, "puncho", "u1", 10);
        let messages = vec![
            create_test_message("m1", "u2", "u1", "one", 3),
            create_test_message("m2", "u2", "u1", "two", 2),
        ];
        let conversation_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[intro.clone()], [intro]])
            .append_query_results([messages.clone(), messages])
            .into_connection();
        let following_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[edge("u1", "u2")]])
            .into_connection();

        let total = create_test_service(conversation_db, following_db)
            .unread_total("u1")
            .await
            .unwrap();

        assert_eq!(total, 3);
    }
}
