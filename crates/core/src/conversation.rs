//! Unified inbox built from assistant notifications and direct messages.
//!
//! Aggregation is pure: the caller loads the raw rows and this module groups
//! them into one conversation per counterpart.

use chrono::{DateTime, FixedOffset};
use punch_db::entities::{message, notification};
use serde::Serialize;

/// Chat identifier shared by both participants: the two ids sorted and joined
/// with `_`.
#[must_use]
pub fn chat_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}_{b}")
    } else {
        format!("{b}_{a}")
    }
}

/// Who the viewer is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationKind {
    Assistant,
    Direct,
}

/// Where a conversation item is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemSource {
    Notification,
    Message,
}

/// One entry in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationItem {
    pub id: String,
    pub source: ItemSource,
    pub from_user_id: String,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl ConversationItem {
    fn from_notification(n: &notification::Model) -> Self {
        Self {
            id: n.id.clone(),
            source: ItemSource::Notification,
            from_user_id: n.from_user_id.clone(),
            text: n.message.clone(),
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }

    fn from_message(m: &message::Model) -> Self {
        Self {
            id: m.id.clone(),
            source: ItemSource::Message,
            from_user_id: m.from_user_id.clone(),
            text: m.text.clone(),
            is_read: m.is_read,
            created_at: m.created_at,
        }
    }

    /// Unread and written by someone other than the viewer.
    #[must_use]
    pub fn is_unread_for(&self, viewer_id: &str) -> bool {
        !self.is_read && self.from_user_id != viewer_id
    }
}

/// A thread with one counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// The assistant id or the peer's user id
    pub id: String,
    pub kind: ConversationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Newest first
    pub messages: Vec<ConversationItem>,
    pub last_message: String,
    pub last_time: Option<DateTime<FixedOffset>>,
    pub unread: bool,
    pub unread_count: usize,
}

impl Conversation {
    fn new(
        id: String,
        kind: ConversationKind,
        chat_id: Option<String>,
        mut messages: Vec<ConversationItem>,
        viewer_id: &str,
        placeholder: &str,
    ) -> Self {
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let unread_count = messages.iter().filter(|m| m.is_unread_for(viewer_id)).count();
        let (last_message, last_time) = messages.first().map_or_else(
            || (placeholder.to_string(), None),
            |m| (m.text.clone(), Some(m.created_at)),
        );

        Self {
            id,
            kind,
            chat_id,
            messages,
            last_message,
            last_time,
            unread: unread_count > 0,
            unread_count,
        }
    }

    /// Ids of items the viewer has not read, split by where they are stored.
    #[must_use]
    pub fn unread_item_ids(&self, viewer_id: &str) -> (Vec<String>, Vec<String>) {
        let mut notifications = Vec::new();
        let mut messages = Vec::new();

        for item in self.messages.iter().filter(|m| m.is_unread_for(viewer_id)) {
            match item.source {
                ItemSource::Notification => notifications.push(item.id.clone()),
                ItemSource::Message => messages.push(item.id.clone()),
            }
        }

        (notifications, messages)
    }
}

/// Inputs for [`build_conversations`].
#[derive(Debug, Clone, Copy)]
pub struct InboxSources<'a> {
    pub notifications: &'a [notification::Model],
    pub messages: &'a [message::Model],
    /// Peers in display order for ties
    pub mutual_follows: &'a [String],
}

/// Group raw inbox rows into conversations.
///
/// The assistant thread, when it has any item, comes first among equals;
/// each mutual follow gets a thread even without messages. The result is
/// ordered by `last_time`, newest first, with empty threads last. The sort is
/// stable so ties keep that insertion order.
#[must_use]
pub fn build_conversations(
    viewer_id: &str,
    assistant_id: &str,
    sources: InboxSources<'_>,
    placeholder: &str,
) -> Vec<Conversation> {
    let mut conversations = Vec::with_capacity(sources.mutual_follows.len() + 1);

    let assistant_items: Vec<ConversationItem> = sources
        .notifications
        .iter()
        .filter(|n| n.notification_type.in_assistant_thread())
        .filter(|n| {
            n.to_user_id == viewer_id
                || (n.from_user_id == viewer_id && n.to_user_id == assistant_id)
        })
        .map(ConversationItem::from_notification)
        .collect();

    if !assistant_items.is_empty() {
        conversations.push(Conversation::new(
            assistant_id.to_string(),
            ConversationKind::Assistant,
            None,
            assistant_items,
            viewer_id,
            placeholder,
        ));
    }

    for peer_id in sources.mutual_follows {
        if peer_id == viewer_id {
            continue;
        }

        let chat = chat_id(viewer_id, peer_id);
        let items = sources
            .messages
            .iter()
            .filter(|m| m.chat_id == chat)
            .map(ConversationItem::from_message)
            .collect();

        conversations.push(Conversation::new(
            peer_id.clone(),
            ConversationKind::Direct,
            Some(chat),
            items,
            viewer_id,
            placeholder,
        ));
    }

    // `None` sorts below every timestamp, so reversing the comparison puts empty threads last.
    conversations.sort_by(|a, b| b.last_time.cmp(&a.last_time));
    conversations
}
