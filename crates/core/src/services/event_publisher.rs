//! Event publisher service.
//!
//! Services announce committed changes through [`EventPublisher`] without
//! depending on how subscribers are reached.

use async_trait::async_trait;
use punch_common::AppResult;
use punch_db::entities::notification::NotificationType;
use std::sync::Arc;

/// A committed change that may alter what a user sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A notification was created or changed.
    Notification {
        id: String,
        user_id: String,
        notification_type: NotificationType,
    },
    /// A direct message was sent.
    DirectMessage {
        id: String,
        sender_id: String,
        recipient_id: String,
    },
    /// A follow edge or request between two users changed.
    FollowChanged {
        follower_id: String,
        followee_id: String,
    },
    /// A punch card changed.
    PunchCardChanged {
        user_id: String,
        restaurant_id: String,
        count: i32,
    },
    /// Items were marked read by a user.
    ConversationRead { user_id: String },
    /// A profile was updated.
    ProfileUpdated { user_id: String },
}

impl StreamEvent {
    /// Users whose view depends on this event.
    #[must_use]
    pub fn audience(&self) -> Vec<&str> {
        match self {
            Self::Notification { user_id, .. }
            | Self::PunchCardChanged { user_id, .. }
            | Self::ConversationRead { user_id }
            | Self::ProfileUpdated { user_id } => vec![user_id.as_str()],
            Self::DirectMessage {
                sender_id,
                recipient_id,
                ..
            } => vec![sender_id.as_str(), recipient_id.as_str()],
            Self::FollowChanged {
                follower_id,
                followee_id,
            } => vec![follower_id.as_str(), followee_id.as_str()],
        }
    }
}

/// Trait for publishing change events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event.
    async fn publish(&self, event: StreamEvent) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when change feeds are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: StreamEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Type alias for a shared event publisher.
pub type EventPublisherService = Arc<dyn EventPublisher>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_message_reaches_both_participants() {
        let event = StreamEvent::DirectMessage {
            id: "m1".to_string(),
            sender_id: "a".to_string(),
            recipient_id: "b".to_string(),
        };
        assert_eq!(event.audience(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_noop_publisher() {
        let publisher: EventPublisherService = Arc::new(NoOpEventPublisher);
        let result = publisher
            .publish(StreamEvent::ConversationRead {
                user_id: "a".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }
}
