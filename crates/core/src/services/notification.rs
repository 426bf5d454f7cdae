//! Notification service.

use crate::services::event_publisher::{EventPublisherService, StreamEvent};
use punch_common::{AppResult, IdGenerator};
use punch_db::{
    entities::notification::{self, NotificationType, RequestStatus},
    repositories::NotificationRepository,
};
use sea_orm::Set;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    event_publisher: Option<EventPublisherService>,
    assistant_id: String,
    assistant_name: String,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub fn new(
        notification_repo: NotificationRepository,
        assistant_id: impl Into<String>,
        assistant_name: impl Into<String>,
    ) -> Self {
        Self {
            notification_repo,
            event_publisher: None,
            assistant_id: assistant_id.into(),
            assistant_name: assistant_name.into(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// The id the assistant sends notifications as.
    #[must_use]
    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// Greet a newly registered user in the assistant thread.
    pub async fn create_intro(&self, user_id: &str) -> AppResult<notification::Model> {
        let message = format!(
            "Hi! I'm {}. Tap your phone on a restaurant's tag to collect punches, and I'll let you know when a reward is ready.",
            self.assistant_name
        );
        self.create_internal(
            &self.assistant_id,
            user_id,
            NotificationType::PunchoIntro,
            message,
        )
        .await
    }

    /// Tell `followee_id` that `follower_username` asked to follow them.
    pub async fn create_follow_request(
        &self,
        follower_id: &str,
        followee_id: &str,
        follower_username: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            follower_id,
            followee_id,
            NotificationType::FollowRequest,
            format!("@{follower_username} wants to follow you"),
        )
        .await
    }

    /// Tell a requester their follow request was approved.
    pub async fn create_request_accepted(
        &self,
        requester_id: &str,
        followee_username: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            &self.assistant_id,
            requester_id,
            NotificationType::FollowRequestAccepted,
            format!("@{followee_username} accepted your follow request"),
        )
        .await
    }

    /// Tell a requester their follow request was denied.
    pub async fn create_request_denied(
        &self,
        requester_id: &str,
        followee_username: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            &self.assistant_id,
            requester_id,
            NotificationType::FollowDenied,
            format!("@{followee_username} declined your follow request"),
        )
        .await
    }

    /// Suggest following back someone whose request was just approved.
    pub async fn create_follow_suggestion(
        &self,
        user_id: &str,
        requester_username: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            &self.assistant_id,
            user_id,
            NotificationType::FollowSuggestion,
            format!("@{requester_username} now follows you. Follow back?"),
        )
        .await
    }

    /// Record a message a user typed into the assistant thread.
    pub async fn create_assistant_message(
        &self,
        user_id: &str,
        text: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            user_id,
            &self.assistant_id,
            NotificationType::PunchoReply,
            text.to_string(),
        )
        .await
    }

    /// The assistant's answer in its thread.
    pub async fn create_assistant_reply(
        &self,
        user_id: &str,
        text: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            &self.assistant_id,
            user_id,
            NotificationType::PunchoReply,
            text.to_string(),
        )
        .await
    }

    /// Notifications addressed to a user.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_recipient(user_id, limit, until_id, unread_only)
            .await
    }

    /// Mark notifications read. Returns how many changed.
    pub async fn mark_as_read(&self, user_id: &str, ids: &[String]) -> AppResult<u64> {
        let marked = self.notification_repo.mark_as_read(user_id, ids).await?;

        if marked > 0 {
            self.publish(StreamEvent::ConversationRead {
                user_id: user_id.to_string(),
            })
            .await;
        }

        Ok(marked)
    }

    /// Number of unread notifications.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    async fn create_internal(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        notification_type: NotificationType,
        message: String,
    ) -> AppResult<notification::Model> {
        let status =
            (notification_type == NotificationType::FollowRequest).then_some(RequestStatus::Pending);

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            notification_type: Set(notification_type),
            from_user_id: Set(from_user_id.to_string()),
            to_user_id: Set(to_user_id.to_string()),
            message: Set(message),
            status: Set(status),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;

        tracing::debug!(
            notification_id = %notification.id,
            to = %to_user_id,
            kind = ?notification_type,
            "Created notification"
        );

        self.publish(StreamEvent::Notification {
            id: notification.id.clone(),
            user_id: to_user_id.to_string(),
            notification_type,
        })
        .await;

        // Items a user sends to the assistant show up in their own thread too.
        if to_user_id == self.assistant_id {
            self.publish(StreamEvent::Notification {
                id: notification.id.clone(),
                user_id: from_user_id.to_string(),
                notification_type,
            })
            .await;
        }

        Ok(notification)
    }

    async fn publish(&self, event: StreamEvent) {
        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher.publish(event).await
        {
            tracing::warn!(error = %e, "Failed to publish notification event");
        }
    }
}
