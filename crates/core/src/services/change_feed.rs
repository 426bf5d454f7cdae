//! Per-user change feed.
//!
//! Each user with an open subscription has a `watch` channel carrying a
//! version counter. Publishing bumps the version; subscribers wake up, reload
//! their whole view and replace what they had. Intermediate versions may be
//! skipped, which is fine because every reload is a full snapshot.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use punch_common::AppResult;
use tokio::sync::watch;

use super::event_publisher::{EventPublisher, StreamEvent};

/// Hub of per-user change channels.
#[derive(Clone, Default)]
pub struct ChangeHub {
    channels: Arc<RwLock<HashMap<String, watch::Sender<u64>>>>,
}

impl ChangeHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to changes affecting `user_id`.
    #[must_use]
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let receiver = match channels.get(user_id) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = watch::channel(0);
                channels.insert(user_id.to_string(), sender);
                receiver
            }
        };

        Subscription {
            user_id: user_id.to_string(),
            receiver,
            hub: self.clone(),
        }
    }

    /// Signal that `user_id`'s view changed. No-op without subscribers.
    pub fn notify(&self, user_id: &str) {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(sender) = channels.get(user_id) {
            sender.send_modify(|version| *version = version.wrapping_add(1));
        }
    }

    /// Number of open subscriptions for a user.
    #[must_use]
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user_id)
            .map_or(0, watch::Sender::receiver_count)
    }

    /// Drop channels nobody listens to. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    fn release(&self, user_id: &str) {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // The departing receiver is still alive while this runs.
        if channels
            .get(user_id)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            channels.remove(user_id);
        }
    }
}

#[async_trait]
impl EventPublisher for ChangeHub {
    async fn publish(&self, event: StreamEvent) -> AppResult<()> {
        for user_id in event.audience() {
            self.notify(user_id);
        }
        Ok(())
    }
}

/// An open subscription. Unsubscribes when dropped.
pub struct Subscription {
    user_id: String,
    receiver: watch::Receiver<u64>,
    hub: ChangeHub,
}

impl Subscription {
    /// The subscribed user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Wait for the next change. Returns `false` once the channel is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(&self.user_id);
    }
}
