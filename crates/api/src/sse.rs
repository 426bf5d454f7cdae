//! Server-Sent Events for the live inbox.
//!
//! A client holds `GET /api/conversations/stream` open and receives a full
//! conversation snapshot on connect and again after every change that
//! touches them. Changes arriving while a snapshot is loading coalesce into
//! one follow-up snapshot.

use std::{convert::Infallible, future::Future, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use punch_common::AppResult;
use punch_core::{Subscription, conversation::Conversation};
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState};

/// Events sent on the inbox stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SseEvent {
    /// First event after the stream opens.
    Connected,
    /// The viewer's conversations, newest activity first.
    #[serde(rename_all = "camelCase")]
    Conversations {
        conversations: Vec<Conversation>,
        unread_total: usize,
    },
    /// A snapshot could not be loaded; the stream stays open.
    Error { code: String },
}

impl SseEvent {
    fn snapshot(conversations: Vec<Conversation>) -> Self {
        let unread_total = conversations.iter().map(|c| c.unread_count).sum();
        Self::Conversations {
            conversations,
            unread_total,
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Conversations { .. } => "conversations",
            Self::Error { .. } => "error",
        }
    }

    fn into_event(self) -> Event {
        Event::default()
            .event(self.name())
            .json_data(&self)
            .unwrap_or_else(|_| Event::default().data("error"))
    }
}

/// One snapshot now, then one per change seen on `subscription`.
///
/// Ends when the hub side of the subscription goes away. Dropping the stream
/// drops the subscription.
pub fn snapshot_stream<F, Fut>(
    subscription: Subscription,
    load: F,
) -> impl Stream<Item = SseEvent> + Send
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<Vec<Conversation>>> + Send,
{
    stream::unfold(
        (subscription, load, true),
        |(mut subscription, load, first)| async move {
            if !first && !subscription.changed().await {
                return None;
            }

            let event = match load().await {
                Ok(conversations) => SseEvent::snapshot(conversations),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        user_id = %subscription.user_id(),
                        "Failed to load conversation snapshot"
                    );
                    SseEvent::Error {
                        code: e.error_code().to_string(),
                    }
                }
            };

            Some((event, (subscription, load, false)))
        },
    )
}

/// SSE handler for the caller's conversations.
pub async fn conversations_stream(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before the first load so nothing slips between them
    let subscription = state.change_hub.subscribe(&user.id);
    tracing::debug!(user_id = %user.id, "Inbox stream opened");

    let service = state.conversation_service.clone();
    let viewer_id = user.id;
    let snapshots = snapshot_stream(subscription, move || {
        let service = service.clone();
        let viewer_id = viewer_id.clone();
        async move { service.list(&viewer_id).await }
    });

    let stream = stream::once(async { SseEvent::Connected })
        .chain(snapshots)
        .map(|event| Ok(event.into_event()));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use punch_common::AppError;
    use punch_core::ChangeHub;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    fn counting_loader(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<AppResult<Vec<Conversation>>> + Send + 'static {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_snapshot_sent_on_connect() {
        let hub = ChangeHub::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = Box::pin(snapshot_stream(
            hub.subscribe("alice"),
            counting_loader(calls.clone()),
        ));

        let first = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        match first {
            SseEvent::Conversations {
                conversations,
                unread_total,
            } => {
                assert!(conversations.is_empty());
                assert_eq!(unread_total, 0);
            }
            other => panic!("Expected snapshot, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_change_triggers_new_snapshot() {
        let hub = ChangeHub::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = Box::pin(snapshot_stream(
            hub.subscribe("alice"),
            counting_loader(calls.clone()),
        ));

        timeout(WAIT, stream.next()).await.unwrap().unwrap();

        hub.notify("alice");
        let second = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        assert!(matches!(second, SseEvent::Conversations { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_users_changes_are_ignored() {
        let hub = ChangeHub::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = Box::pin(snapshot_stream(
            hub.subscribe("alice"),
            counting_loader(calls.clone()),
        ));

        timeout(WAIT, stream.next()).await.unwrap().unwrap();

        hub.notify("bob");
        assert!(
            timeout(Duration::from_millis(50), stream.next())
                .await
                .is_err()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_failure_becomes_error_event() {
        let hub = ChangeHub::new();
        let mut stream = Box::pin(snapshot_stream(hub.subscribe("alice"), || {
            std::future::ready(AppResult::<Vec<Conversation>>::Err(AppError::Database(
                "connection reset".to_string(),
            )))
        }));

        let event = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        match event {
            SseEvent::Error { code } => assert_eq!(code, "DATABASE_ERROR"),
            other => panic!("Expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let hub = ChangeHub::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let stream = snapshot_stream(hub.subscribe("alice"), counting_loader(calls));
        assert_eq!(hub.subscriber_count("alice"), 1);

        drop(stream);
        assert_eq!(hub.subscriber_count("alice"), 0);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(SseEvent::Connected).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "connected" }));

        let json = serde_json::to_value(SseEvent::snapshot(Vec::new())).unwrap();
        assert_eq!(json["type"], "conversations");
        assert_eq!(json["unreadTotal"], 0);
    }
}
