//! Following service.
//!
//! Follows of public users take effect at once. Follows of private users go
//! through a request that the followee approves or denies exactly once.

use punch_common::{AppError, AppResult, IdGenerator};
use punch_db::{
    entities::{follow_request, following, notification::RequestStatus, user},
    repositories::{
        FollowRequestRepository, FollowingRepository, NotificationRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::event_publisher::{EventPublisherService, StreamEvent};
use crate::services::notification::NotificationService;
use crate::social::{FollowState, PrivacyFacet, can_view_facet};

/// Both directions of a relationship between two users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// From the viewer to the other user
    pub outgoing: FollowState,
    /// From the other user to the viewer
    pub incoming: FollowState,
}

impl Relationship {
    #[must_use]
    pub fn is_mutual(&self) -> bool {
        self.outgoing == FollowState::Following && self.incoming == FollowState::Following
    }
}

/// Answer to a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestResponse {
    Approve,
    Deny,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    follow_request_repo: FollowRequestRepository,
    user_repo: UserRepository,
    notification_repo: NotificationRepository,
    notification_service: NotificationService,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        following_repo: FollowingRepository,
        follow_request_repo: FollowRequestRepository,
        user_repo: UserRepository,
        notification_repo: NotificationRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            following_repo,
            follow_request_repo,
            user_repo,
            notification_repo,
            notification_service,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Follow a user.
    ///
    /// Following a private user creates a pending request instead. Following
    /// someone already followed or already requested returns the current
    /// state without changing anything.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowState> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        let follower = self.user_repo.get_by_id(follower_id).await?;
        let followee = self.user_repo.get_by_id(followee_id).await?;

        if self
            .following_repo
            .is_following(follower_id, followee_id)
            .await?
        {
            return Ok(FollowState::Following);
        }

        if followee.is_private() {
            return self.request(&follower, &followee).await;
        }

        if self
            .following_repo
            .follow(&self.id_gen.generate(), follower_id, followee_id)
            .await?
        {
            tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Followed");
            self.publish_change(follower_id, followee_id).await;
        }
        Ok(FollowState::Following)
    }

    /// Unfollow a user, or withdraw a pending request. No-op otherwise.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowState> {
        if self
            .following_repo
            .unfollow(follower_id, followee_id)
            .await?
        {
            tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Unfollowed");
            self.publish_change(follower_id, followee_id).await;
            return Ok(FollowState::None);
        }

        if self
            .follow_request_repo
            .withdraw(follower_id, followee_id)
            .await?
        {
            tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Follow request withdrawn");
            self.publish_change(follower_id, followee_id).await;
        }

        Ok(FollowState::None)
    }

    /// Answer the pending request from `requester_id` to `followee_id`.
    ///
    /// The request row is claimed by deleting it, so of two concurrent answers
    /// only one takes effect; the other gets `AlreadyResolved`. The claim, the
    /// new edge and the notification status change commit together.
    pub async fn respond_to_request(
        &self,
        followee_id: &str,
        requester_id: &str,
        response: RequestResponse,
    ) -> AppResult<FollowState> {
        let followee = self.user_repo.get_by_id(followee_id).await?;
        let requester = self.user_repo.get_by_id(requester_id).await?;

        let claimed = match response {
            RequestResponse::Approve => {
                self.following_repo
                    .accept_request(&self.id_gen.generate(), requester_id, followee_id)
                    .await?
            }
            RequestResponse::Deny => {
                self.follow_request_repo
                    .deny(requester_id, followee_id)
                    .await?
            }
        };

        if !claimed {
            let previous = self
                .notification_repo
                .find_follow_request(requester_id, followee_id)
                .await?;

            return match previous.and_then(|n| n.status) {
                Some(RequestStatus::Approved | RequestStatus::Denied) => Err(
                    AppError::AlreadyResolved("Follow request was already answered".to_string()),
                ),
                _ => Err(AppError::NotFound("Follow request".to_string())),
            };
        }

        let state = match response {
            RequestResponse::Approve => {
                if let Err(e) = self
                    .notification_service
                    .create_request_accepted(requester_id, &followee.username)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to notify requester of approval");
                }
                if let Err(e) = self
                    .notification_service
                    .create_follow_suggestion(followee_id, &requester.username)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to send follow-back suggestion");
                }

                FollowState::Following
            }
            RequestResponse::Deny => {
                if let Err(e) = self
                    .notification_service
                    .create_request_denied(requester_id, &followee.username)
                    .await
                {
                    tracing::warn!(error = %e, "Failed to notify requester of denial");
                }

                FollowState::None
            }
        };

        tracing::info!(
            requester_id = %requester_id,
            followee_id = %followee_id,
            response = ?response,
            "Follow request answered"
        );
        self.publish_change(requester_id, followee_id).await;

        Ok(state)
    }

    /// State of the follow from `from_id` to `to_id`.
    pub async fn state(&self, from_id: &str, to_id: &str) -> AppResult<FollowState> {
        if self.following_repo.is_following(from_id, to_id).await? {
            return Ok(FollowState::Following);
        }
        if self.follow_request_repo.is_pending(from_id, to_id).await? {
            return Ok(FollowState::Pending);
        }
        Ok(FollowState::None)
    }

    /// Both directions between `viewer_id` and `other_id`.
    pub async fn relationship(&self, viewer_id: &str, other_id: &str) -> AppResult<Relationship> {
        Ok(Relationship {
            outgoing: self.state(viewer_id, other_id).await?,
            incoming: self.state(other_id, viewer_id).await?,
        })
    }

    /// Requests waiting on a user's answer, newest first.
    pub async fn pending_requests(
        &self,
        followee_id: &str,
        limit: u64,
    ) -> AppResult<Vec<follow_request::Model>> {
        self.follow_request_repo
            .find_by_followee(followee_id, limit)
            .await
    }

    /// Users following `user_id`, if `viewer_id` may see that list.
    pub async fn followers(
        &self,
        viewer_id: Option<&str>,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        self.ensure_visible(viewer_id, user_id, PrivacyFacet::Followers)
            .await?;
        self.following_repo
            .find_followers(user_id, limit, until_id)
            .await
    }

    /// Users `user_id` follows, if `viewer_id` may see that list.
    pub async fn following(
        &self,
        viewer_id: Option<&str>,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        self.ensure_visible(viewer_id, user_id, PrivacyFacet::Following)
            .await?;
        self.following_repo
            .find_following(user_id, limit, until_id)
            .await
    }

    async fn ensure_visible(
        &self,
        viewer_id: Option<&str>,
        user_id: &str,
        facet: PrivacyFacet,
    ) -> AppResult<()> {
        let subject = self.user_repo.get_by_id(user_id).await?;

        let viewer_follows = match viewer_id {
            Some(viewer) if viewer != user_id => {
                self.following_repo.is_following(viewer, user_id).await?
            }
            _ => false,
        };

        if can_view_facet(viewer_id, &subject, viewer_follows, facet) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} hides this list",
                subject.username
            )))
        }
    }

    /// IDs of users who follow `user_id` and are followed back.
    pub async fn mutual_follows(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.following_repo.find_mutual_ids(user_id).await
    }

    async fn request(&self, follower: &user::Model, followee: &user::Model) -> AppResult<FollowState> {
        if self
            .follow_request_repo
            .is_pending(&follower.id, &followee.id)
            .await?
        {
            return Ok(FollowState::Pending);
        }

        let model = follow_request::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower.id.clone()),
            followee_id: Set(followee.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.follow_request_repo.create(model).await?;

        self.notification_service
            .create_follow_request(&follower.id, &followee.id, &follower.username)
            .await?;

        tracing::info!(follower_id = %follower.id, followee_id = %followee.id, "Follow requested");
        self.publish_change(&follower.id, &followee.id).await;
        Ok(FollowState::Pending)
    }

    async fn publish_change(&self, follower_id: &str, followee_id: &str) {
        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish(StreamEvent::FollowChanged {
                    follower_id: follower_id.to_string(),
                    followee_id: followee_id.to_string(),
                })
                .await
        {
            tracing::warn!(error = %e, "Failed to publish follow event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{create_private_user, create_test_notification, create_test_user};
    use punch_db::entities::notification::{self, NotificationType};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    struct Dbs {
        following: DatabaseConnection,
        follow_request: DatabaseConnection,
        user: DatabaseConnection,
        notification: DatabaseConnection,
        notifier: DatabaseConnection,
    }

    impl Default for Dbs {
        fn default() -> Self {
            let empty = || MockDatabase::new(DatabaseBackend::Postgres).into_connection();
            Self {
                following: empty(),
                follow_request: empty(),
                user: empty(),
                notification: empty(),
                notifier: empty(),
            }
        }
    }

    fn create_test_service(dbs: Dbs) -> FollowingService {
        FollowingService::new(
            FollowingRepository::new(Arc::new(dbs.following)),
            FollowRequestRepository::new(Arc::new(dbs.follow_request)),
            UserRepository::new(Arc::new(dbs.user)),
            NotificationRepository::new(Arc::new(dbs.notification)),
            NotificationService::new(
                NotificationRepository::new(Arc::new(dbs.notifier)),
                "puncho",
                "Puncho",
            ),
        )
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn edge(follower: &str, followee: &str) -> following::Model {
        following::Model {
            id: format!("{follower}-{followee}"),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn request(follower: &str, followee: &str) -> follow_request::Model {
        follow_request::Model {
            id: format!("req-{follower}-{followee}"),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_cannot_follow_self() {
        let result = create_test_service(Dbs::default()).follow("a", "a").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_unknown_user() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("a", "alice")]])
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs).follow("a", "missing").await;
        match result {
            Err(AppError::UserNotFound(id)) => assert_eq!(id, "missing"),
            _ => panic!("Expected UserNotFound"),
        }
    }

    #[tokio::test]
    async fn test_follow_public_user() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("a", "alice")]])
                .append_query_results([[create_test_user("b", "bob")]])
                .into_connection(),
            // edge, two counters, no leftover request
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .append_exec_results([exec(1), exec(1), exec(1), exec(0)])
                .into_connection(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs).follow("a", "b").await.unwrap();
        assert_eq!(state, FollowState::Following);
    }

    #[tokio::test]
    async fn test_follow_after_followee_went_public_clears_request() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("a", "alice")]])
                .append_query_results([[create_test_user("b", "bob")]])
                .into_connection(),
            // edge, two counters, leftover request, its notification
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .append_exec_results([exec(1), exec(1), exec(1), exec(1), exec(1)])
                .into_connection(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs).follow("a", "b").await.unwrap();
        assert_eq!(state, FollowState::Following);
    }

    #[tokio::test]
    async fn test_follow_private_user_creates_request() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("a", "alice")]])
                .append_query_results([[create_private_user("b", "bob")]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
            follow_request: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follow_request::Model>::new()])
                .append_query_results([[request("a", "b")]])
                .into_connection(),
            notifier: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_notification(
                    "n1",
                    NotificationType::FollowRequest,
                    "a",
                    "b",
                    0,
                )]])
                .into_connection(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs).follow("a", "b").await.unwrap();
        assert_eq!(state, FollowState::Pending);
    }

    #[tokio::test]
    async fn test_follow_when_already_following_is_noop() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("a", "alice")]])
                .append_query_results([[create_test_user("b", "bob")]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge("a", "b")]])
                .into_connection(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs).follow("a", "b").await.unwrap();
        assert_eq!(state, FollowState::Following);
    }

    #[tokio::test]
    async fn test_unfollow_decrements_counters() {
        let dbs = Dbs {
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(1)])
                .into_connection(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs).unfollow("a", "b").await.unwrap();
        assert_eq!(state, FollowState::None);
    }

    #[tokio::test]
    async fn test_unfollow_withdraws_pending_request() {
        let dbs = Dbs {
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
            follow_request: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1)])
                .into_connection(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs).unfollow("a", "b").await.unwrap();
        assert_eq!(state, FollowState::None);
    }

    fn approval_notifier() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_notification(
                "n2",
                NotificationType::FollowRequestAccepted,
                "puncho",
                "a",
                0,
            )]])
            .append_query_results([[create_test_notification(
                "n3",
                NotificationType::FollowSuggestion,
                "puncho",
                "b",
                0,
            )]])
            .into_connection()
    }

    #[tokio::test]
    async fn test_approve_after_followee_went_public() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("b", "bob")]])
                .append_query_results([[create_test_user("a", "alice")]])
                .into_connection(),
            // claim, edge already present, notification resolved
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(0), exec(1)])
                .into_connection(),
            notifier: approval_notifier(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs)
            .respond_to_request("b", "a", RequestResponse::Approve)
            .await
            .unwrap();
        assert_eq!(state, FollowState::Following);
    }

    #[tokio::test]
    async fn test_approve_request() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_private_user("b", "bob")]])
                .append_query_results([[create_test_user("a", "alice")]])
                .into_connection(),
            // claim, edge, two counters, notification resolved
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(1), exec(1), exec(1), exec(1), exec(1)])
                .into_connection(),
            notifier: approval_notifier(),
            ..Dbs::default()
        };

        let state = create_test_service(dbs)
            .respond_to_request("b", "a", RequestResponse::Approve)
            .await
            .unwrap();
        assert_eq!(state, FollowState::Following);
    }

    #[tokio::test]
    async fn test_respond_twice_is_already_resolved() {
        let mut resolved =
            create_test_notification("n1", NotificationType::FollowRequest, "a", "b", 5);
        resolved.status = Some(RequestStatus::Approved);
        resolved.is_read = true;

        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_private_user("b", "bob")]])
                .append_query_results([[create_test_user("a", "alice")]])
                .into_connection(),
            follow_request: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
            notification: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[resolved]])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs)
            .respond_to_request("b", "a", RequestResponse::Deny)
            .await;
        assert!(matches!(result, Err(AppError::AlreadyResolved(_))));
    }

    #[tokio::test]
    async fn test_respond_without_request_is_not_found() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_private_user("b", "bob")]])
                .append_query_results([[create_test_user("a", "alice")]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
            notification: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs)
            .respond_to_request("b", "a", RequestResponse::Approve)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_relationship_mutual() {
        let dbs = Dbs {
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge("a", "b")]])
                .append_query_results([[edge("b", "a")]])
                .into_connection(),
            ..Dbs::default()
        };

        let relationship = create_test_service(dbs).relationship("a", "b").await.unwrap();
        assert!(relationship.is_mutual());
    }

    #[tokio::test]
    async fn test_private_followers_hidden_from_stranger() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_private_user("b", "bob")]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs)
            .followers(Some("a"), "b", 10, None)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_owner_sees_own_private_followers() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_private_user("b", "bob")]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge("a", "b")]])
                .into_connection(),
            ..Dbs::default()
        };

        let followers = create_test_service(dbs)
            .followers(Some("b"), "b", 10, None)
            .await
            .unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].follower_id, "a");
    }

    #[tokio::test]
    async fn test_hidden_following_list() {
        let user = user::Model {
            show_following: false,
            ..create_test_user("b", "bob")
        };
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge("a", "b")]])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs)
            .following(Some("a"), "b", 10, None)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
