//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use punch_common::{Config, StorageBackend, config::PunchConfig};
use punch_core::{
    ChangeHub, ConversationService, EventPublisherService, FollowingService, MessagingService,
    NotificationService, PunchService, RestaurantService, TagResolverService, UserService,
};
use punch_db::repositories::{
    ConversationRepository, FollowRequestRepository, FollowingRepository, MessageRepository,
    NotificationRepository, PunchCardRepository, RestaurantLikeRepository, RestaurantRepository,
    RewardHistoryRepository, UserRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub restaurant_service: RestaurantService,
    pub punch_service: PunchService,
    pub following_service: FollowingService,
    pub notification_service: NotificationService,
    pub messaging_service: MessagingService,
    pub conversation_service: ConversationService,
    pub tag_resolver: TagResolverService,
    pub change_hub: ChangeHub,
    pub punch: Arc<PunchConfig>,
}

impl AppState {
    /// Wire every service over one connection. Change events from all of
    /// them are delivered through `change_hub`.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &Config,
        storage: Option<Arc<dyn StorageBackend>>,
    ) -> Self {
        let punch = &config.punch;
        let change_hub = ChangeHub::new();
        let publisher: EventPublisherService = Arc::new(change_hub.clone());

        let user_repo = UserRepository::new(Arc::clone(&db));
        let restaurant_repo = RestaurantRepository::new(Arc::clone(&db));
        let like_repo = RestaurantLikeRepository::new(Arc::clone(&db));
        let punch_card_repo = PunchCardRepository::new(Arc::clone(&db));
        let reward_history_repo = RewardHistoryRepository::new(Arc::clone(&db));
        let following_repo = FollowingRepository::new(Arc::clone(&db));
        let follow_request_repo = FollowRequestRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let message_repo = MessageRepository::new(Arc::clone(&db));
        let conversation_repo = ConversationRepository::new(Arc::clone(&db));

        let mut notification_service = NotificationService::new(
            notification_repo.clone(),
            &punch.assistant_id,
            &punch.assistant_name,
        );
        notification_service.set_event_publisher(publisher.clone());

        let mut user_service = UserService::new(
            user_repo.clone(),
            following_repo.clone(),
            follow_request_repo.clone(),
            like_repo.clone(),
            punch_card_repo.clone(),
            reward_history_repo.clone(),
        );
        user_service.set_notification_service(notification_service.clone());
        user_service.set_event_publisher(publisher.clone());

        let mut restaurant_service =
            RestaurantService::new(restaurant_repo.clone(), like_repo, user_repo.clone());

        if let Some(storage) = storage {
            user_service.set_storage(storage.clone());
            restaurant_service.set_storage(storage);
        } else {
            tracing::warn!("No object storage configured; avatar and logo uploads are disabled");
        }

        let tag_resolver = TagResolverService::new(restaurant_repo.clone(), &punch.peer_marker);

        let mut punch_service = PunchService::new(
            punch_card_repo,
            restaurant_repo,
            user_repo.clone(),
            reward_history_repo,
            tag_resolver.clone(),
            punch.default_total,
        );
        punch_service.set_event_publisher(publisher.clone());

        let mut following_service = FollowingService::new(
            following_repo.clone(),
            follow_request_repo,
            user_repo.clone(),
            notification_repo,
            notification_service.clone(),
        );
        following_service.set_event_publisher(publisher.clone());

        let mut messaging_service = MessagingService::new(
            message_repo,
            following_repo.clone(),
            user_repo,
            notification_service.clone(),
        );
        messaging_service.set_event_publisher(publisher.clone());

        let mut conversation_service = ConversationService::new(
            conversation_repo,
            following_repo,
            config.retry.to_policy(),
            &punch.assistant_id,
            &punch.empty_conversation_text,
        )
        .with_window(punch.inbox_window);
        conversation_service.set_event_publisher(publisher);

        Self {
            user_service,
            restaurant_service,
            punch_service,
            following_service,
            notification_service,
            messaging_service,
            conversation_service,
            tag_resolver,
            change_hub,
            punch: Arc::new(punch.clone()),
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. A `token` query parameter is accepted as well, since
/// browser `EventSource` clients cannot set headers. Unknown tokens are
/// ignored here; endpoints that need a caller reject through
/// [`crate::extractors::AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req).or_else(|| query_token(&req)) {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Token lookup failed");
            }
            Err(_) => {}
        }
    }

    next.run(req).await
}

fn bearer_token(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn query_token(req: &Request<Body>) -> Option<String> {
    req.uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
