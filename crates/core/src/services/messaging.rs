//! Messaging service for direct messages and the assistant thread.

use punch_common::{AppError, AppResult, IdGenerator};
use punch_db::{
    entities::{message, notification},
    repositories::{FollowingRepository, MessageRepository, UserRepository},
};
use sea_orm::Set;

use crate::conversation::chat_id;
use crate::services::event_publisher::{EventPublisherService, StreamEvent};
use crate::services::notification::NotificationService;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Messaging service.
#[derive(Clone)]
pub struct MessagingService {
    message_repo: MessageRepository,
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl MessagingService {
    /// Create a new messaging service.
    #[must_use]
    pub const fn new(
        message_repo: MessageRepository,
        following_repo: FollowingRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            message_repo,
            following_repo,
            user_repo,
            notification_service,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Send a message to a mutual follow.
    pub async fn send(
        &self,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
    ) -> AppResult<message::Model> {
        let text = validate_text(text)?;

        if sender_id == recipient_id {
            return Err(AppError::BadRequest(
                "Cannot send a message to yourself".to_string(),
            ));
        }

        self.user_repo.get_by_id(recipient_id).await?;

        if !self.following_repo.is_mutual(sender_id, recipient_id).await? {
            return Err(AppError::Forbidden(
                "Messages can only be sent to mutual follows".to_string(),
            ));
        }

        let model = message::ActiveModel {
            id: Set(self.id_gen.generate()),
            chat_id: Set(chat_id(sender_id, recipient_id)),
            from_user_id: Set(sender_id.to_string()),
            to_user_id: Set(recipient_id.to_string()),
            text: Set(text.to_string()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let message = self.message_repo.create(model).await?;
        tracing::debug!(message_id = %message.id, chat_id = %message.chat_id, "Message sent");

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish(StreamEvent::DirectMessage {
                    id: message.id.clone(),
                    sender_id: sender_id.to_string(),
                    recipient_id: recipient_id.to_string(),
                })
                .await
        {
            tracing::warn!(error = %e, "Failed to publish message event");
        }

        Ok(message)
    }

    /// Messages between the viewer and a peer, newest first.
    pub async fn thread(
        &self,
        viewer_id: &str,
        peer_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        self.message_repo
            .find_by_chat(&chat_id(viewer_id, peer_id), limit, until_id)
            .await
    }

    /// Post into the assistant thread. The assistant acknowledges every message.
    pub async fn send_to_assistant(
        &self,
        user_id: &str,
        text: &str,
    ) -> AppResult<notification::Model> {
        let text = validate_text(text)?;

        let sent = self
            .notification_service
            .create_assistant_message(user_id, text)
            .await?;

        if let Err(e) = self
            .notification_service
            .create_assistant_reply(user_id, &assistant_reply(text))
            .await
        {
            tracing::warn!(error = %e, user_id = %user_id, "Assistant failed to reply");
        }

        Ok(sent)
    }
}

fn validate_text(text: &str) -> AppResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message text is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Message exceeds {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(text)
}

fn assistant_reply(text: &str) -> String {
    let lower = text.to_lowercase();
    if lower.contains("reward") || lower.contains("punch") {
        "Check your wallet to see how close you are to each reward!".to_string()
    } else if lower.contains("follow") || lower.contains("friend") {
        "Search for friends by username and follow them to start chatting.".to_string()
    } else {
        "Thanks for the message! Scan a tag at any partner restaurant to earn punches.".to_string()
    }
}
