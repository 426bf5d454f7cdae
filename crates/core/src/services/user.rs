//! User service.

use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use punch_common::{AppError, AppResult, IdGenerator, StorageBackend, avatar_key};
use punch_db::{
    entities::{
        punch_card, reward_history,
        user::{self, ProfileVisibility},
    },
    repositories::{
        FollowRequestRepository, FollowingRepository, PunchCardRepository,
        RestaurantLikeRepository, RewardHistoryRepository, UserRepository,
    },
};
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::event_publisher::{EventPublisherService, StreamEvent};
use crate::services::notification::NotificationService;
use crate::social::{FollowState, PrivacyFacet, can_view_facet};

/// Maximum number of users returned by a username search.
pub const MAX_SEARCH_RESULTS: u64 = 20;

/// Maximum number of entries shown in a profile's follower lists.
const PROFILE_LIST_LIMIT: u64 = 100;

/// Maximum number of rewards shown in a profile's history.
const PROFILE_HISTORY_LIMIT: u64 = 50;

#[allow(clippy::unwrap_used)]
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,20}$").unwrap());

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    follow_request_repo: FollowRequestRepository,
    like_repo: RestaurantLikeRepository,
    punch_card_repo: PunchCardRepository,
    reward_history_repo: RewardHistoryRepository,
    notification_service: Option<NotificationService>,
    storage: Option<Arc<dyn StorageBackend>>,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 3, max = 20))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 64))]
    pub name: Option<String>,
}

/// Input for updating a profile.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(max = 64))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

/// Input for updating privacy settings. Absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrivacyInput {
    pub profile_visibility: Option<ProfileVisibility>,
    pub show_stores_visited: Option<bool>,
    pub show_liked_restaurants: Option<bool>,
    pub show_followers: Option<bool>,
    pub show_following: Option<bool>,
    pub show_history: Option<bool>,
}

/// A profile as seen by a particular viewer. Hidden sections are `None`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: user::Model,
    /// Viewer's relationship to this user
    pub relationship: FollowState,
    pub stores_visited: Option<Vec<punch_card::Model>>,
    pub liked_restaurants: Option<Vec<String>>,
    pub followers: Option<Vec<String>>,
    pub following: Option<Vec<String>>,
    pub history: Option<Vec<reward_history::Model>>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        following_repo: FollowingRepository,
        follow_request_repo: FollowRequestRepository,
        like_repo: RestaurantLikeRepository,
        punch_card_repo: PunchCardRepository,
        reward_history_repo: RewardHistoryRepository,
    ) -> Self {
        Self {
            user_repo,
            following_repo,
            follow_request_repo,
            like_repo,
            punch_card_repo,
            reward_history_repo,
            notification_service: None,
            storage: None,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to greet new users.
    pub fn set_notification_service(&mut self, notification_service: NotificationService) {
        self.notification_service = Some(notification_service);
    }

    /// Set the storage backend for avatars.
    pub fn set_storage(&mut self, storage: Arc<dyn StorageBackend>) {
        self.storage = Some(storage);
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Register a new user. Counters start at zero and the profile is public.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;

        if !USERNAME_RE.is_match(&input.username) {
            return Err(AppError::BadRequest(
                "Username may only contain letters, digits and underscores".to_string(),
            ));
        }

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            name: Set(input.name),
            token: Set(self.id_gen.generate_token()),
            password: Set(password_hash),
            followers_count: Set(0),
            following_count: Set(0),
            profile_visibility: Set(ProfileVisibility::Public),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

        if let Some(ref notifications) = self.notification_service
            && let Err(e) = notifications.create_intro(&user.id).await
        {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to send intro notification");
        }

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Search users whose username starts with `prefix`. Matching is case-sensitive.
    pub async fn search(&self, prefix: &str, limit: u64) -> AppResult<Vec<user::Model>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(vec![]);
        }

        self.user_repo
            .search_by_username_prefix(prefix, limit.min(MAX_SEARCH_RESULTS))
            .await
    }

    /// Update name and bio.
    pub async fn update_profile(
        &self,
        id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(Some(name));
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let user = self.user_repo.update(active).await?;
        self.publish_profile_update(id).await;
        Ok(user)
    }

    /// Update visibility and privacy facet switches.
    pub async fn update_privacy(
        &self,
        id: &str,
        input: UpdatePrivacyInput,
    ) -> AppResult<user::Model> {
        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(visibility) = input.profile_visibility {
            active.profile_visibility = Set(visibility);
        }
        if let Some(show) = input.show_stores_visited {
            active.show_stores_visited = Set(show);
        }
        if let Some(show) = input.show_liked_restaurants {
            active.show_liked_restaurants = Set(show);
        }
        if let Some(show) = input.show_followers {
            active.show_followers = Set(show);
        }
        if let Some(show) = input.show_following {
            active.show_following = Set(show);
        }
        if let Some(show) = input.show_history {
            active.show_history = Set(show);
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let user = self.user_repo.update(active).await?;
        self.publish_profile_update(id).await;
        Ok(user)
    }

    /// Store a new avatar image and point the profile at it.
    pub async fn set_avatar(
        &self,
        id: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<user::Model> {
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "Unsupported avatar type: {content_type}"
            )));
        }

        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AppError::Config("Storage is not configured".to_string()))?;

        let user = self.user_repo.get_by_id(id).await?;
        let key = avatar_key(id, &self.id_gen.generate(), content_type);
        let uploaded = storage.upload(&key, data, content_type).await?;

        let mut active: user::ActiveModel = user.into();
        active.avatar_url = Set(Some(uploaded.url));
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        match self.user_repo.update(active).await {
            Ok(user) => {
                self.publish_profile_update(id).await;
                Ok(user)
            }
            Err(e) => {
                if let Err(cleanup) = storage.delete(&key).await {
                    tracing::warn!(error = %cleanup, key = %key, "Failed to remove orphaned avatar");
                }
                Err(e)
            }
        }
    }

    /// Load `subject_id`'s profile with only the sections `viewer_id` may see.
    pub async fn profile(
        &self,
        viewer_id: Option<&str>,
        subject_id: &str,
    ) -> AppResult<UserProfile> {
        let subject = self.user_repo.get_by_id(subject_id).await?;

        let relationship = match viewer_id {
            Some(viewer) if viewer != subject_id => {
                if self.following_repo.is_following(viewer, subject_id).await? {
                    FollowState::Following
                } else if self
                    .follow_request_repo
                    .is_pending(viewer, subject_id)
                    .await?
                {
                    FollowState::Pending
                } else {
                    FollowState::None
                }
            }
            _ => FollowState::None,
        };

        let is_follower = relationship == FollowState::Following;
        let visible =
            |facet: PrivacyFacet| can_view_facet(viewer_id, &subject, is_follower, facet);

        let stores_visited = if visible(PrivacyFacet::StoresVisited) {
            Some(self.punch_card_repo.find_by_user(subject_id).await?)
        } else {
            None
        };

        let liked_restaurants = if visible(PrivacyFacet::LikedRestaurants) {
            Some(self.like_repo.find_restaurant_ids_by_user(subject_id).await?)
        } else {
            None
        };

        let followers = if visible(PrivacyFacet::Followers) {
            let edges = self
                .following_repo
                .find_followers(subject_id, PROFILE_LIST_LIMIT, None)
                .await?;
            Some(edges.into_iter().map(|f| f.follower_id).collect())
        } else {
            None
        };

        let following = if visible(PrivacyFacet::Following) {
            let edges = self
                .following_repo
                .find_following(subject_id, PROFILE_LIST_LIMIT, None)
                .await?;
            Some(edges.into_iter().map(|f| f.followee_id).collect())
        } else {
            None
        };

        let history = if visible(PrivacyFacet::History) {
            Some(
                self.reward_history_repo
                    .find_by_user(subject_id, PROFILE_HISTORY_LIMIT)
                    .await?,
            )
        } else {
            None
        };

        Ok(UserProfile {
            user: subject,
            relationship,
            stores_visited,
            liked_restaurants,
            followers,
            following,
            history,
        })
    }

    async fn publish_profile_update(&self, user_id: &str) {
        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish(StreamEvent::ProfileUpdated {
                    user_id: user_id.to_string(),
                })
                .await
        {
            tracing::warn!(error = %e, "Failed to publish profile update");
        }
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{create_private_user, create_test_user};
    use punch_db::entities::{follow_request, following, restaurant_like};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    struct Dbs {
        user: DatabaseConnection,
        following: DatabaseConnection,
        follow_request: DatabaseConnection,
        like: DatabaseConnection,
        punch_card: DatabaseConnection,
        reward_history: DatabaseConnection,
    }

    impl Default for Dbs {
        fn default() -> Self {
            let empty = || MockDatabase::new(DatabaseBackend::Postgres).into_connection();
            Self {
                user: empty(),
                following: empty(),
                follow_request: empty(),
                like: empty(),
                punch_card: empty(),
                reward_history: empty(),
            }
        }
    }

    fn create_test_service(dbs: Dbs) -> UserService {
        UserService::new(
            UserRepository::new(Arc::new(dbs.user)),
            FollowingRepository::new(Arc::new(dbs.following)),
            FollowRequestRepository::new(Arc::new(dbs.follow_request)),
            RestaurantLikeRepository::new(Arc::new(dbs.like)),
            PunchCardRepository::new(Arc::new(dbs.punch_card)),
            RewardHistoryRepository::new(Arc::new(dbs.reward_history)),
        )
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_username_pattern() {
        assert!(USERNAME_RE.is_match("alice_01"));
        assert!(!USERNAME_RE.is_match("al"));
        assert!(!USERNAME_RE.is_match("alice smith"));
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_username() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs)
            .signup(SignupInput {
                username: "alice".to_string(),
                password: "password123".to_string(),
                name: None,
            })
            .await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("taken")),
            _ => panic!("Expected Conflict"),
        }
    }

    #[tokio::test]
    async fn test_signup_rejects_short_password() {
        let result = create_test_service(Dbs::default())
            .signup(SignupInput {
                username: "alice".to_string(),
                password: "short".to_string(),
                name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signup_creates_user() {
        let created = create_test_user("u1", "alice");
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
            ..Dbs::default()
        };

        let user = create_test_service(dbs)
            .signup(SignupInput {
                username: "alice".to_string(),
                password: "password123".to_string(),
                name: Some("Alice".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.followers_count, 0);
        assert_eq!(user.following_count, 0);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let mut stored = create_test_user("u1", "alice");
        stored.password = hash_password("password123").unwrap();

        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored]])
                .into_connection(),
            ..Dbs::default()
        };

        let result = create_test_service(dbs)
            .authenticate("alice", "not-the-password")
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_search_empty_prefix_skips_query() {
        let result = create_test_service(Dbs::default())
            .search("  ", 10)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_private_profile_hidden_from_stranger() {
        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_private_user("u2", "bob")]])
                .into_connection(),
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
            follow_request: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follow_request::Model>::new()])
                .into_connection(),
            ..Dbs::default()
        };

        let profile = create_test_service(dbs)
            .profile(Some("u1"), "u2")
            .await
            .unwrap();

        assert_eq!(profile.relationship, FollowState::None);
        assert!(profile.stores_visited.is_none());
        assert!(profile.liked_restaurants.is_none());
        assert!(profile.followers.is_none());
        assert!(profile.following.is_none());
        assert!(profile.history.is_none());
    }

    #[tokio::test]
    async fn test_public_profile_respects_switches() {
        let mut subject = create_test_user("u2", "bob");
        subject.show_stores_visited = false;
        subject.show_followers = false;
        subject.show_following = false;
        subject.show_history = false;

        let like = restaurant_like::Model {
            id: "l1".to_string(),
            user_id: "u2".to_string(),
            restaurant_id: "r1".to_string(),
            created_at: chrono::Utc::now().into(),
        };

        let dbs = Dbs {
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[subject]])
                .into_connection(),
            like: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[like]])
                .into_connection(),
            ..Dbs::default()
        };

        let profile = create_test_service(dbs).profile(None, "u2").await.unwrap();

        assert_eq!(profile.liked_restaurants, Some(vec!["r1".to_string()]));
        assert!(profile.stores_visited.is_none());
        assert!(profile.history.is_none());
    }
}
