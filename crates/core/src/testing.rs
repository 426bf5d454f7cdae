//! Shared fixtures for unit tests.

use chrono::Utc;
use punch_db::entities::{
    message,
    notification::{self, NotificationType, RequestStatus},
    restaurant,
    user::{self, ProfileVisibility},
};
use serde_json::json;

pub fn create_test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        name: Some("Test User".to_string()),
        bio: None,
        avatar_url: None,
        token: format!("token-{id}"),
        password: String::new(),
        followers_count: 0,
        following_count: 0,
        profile_visibility: ProfileVisibility::Public,
        show_stores_visited: true,
        show_liked_restaurants: true,
        show_followers: true,
        show_following: true,
        show_history: true,
        is_admin: false,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub fn create_private_user(id: &str, username: &str) -> user::Model {
    user::Model {
        profile_visibility: ProfileVisibility::Private,
        ..create_test_user(id, username)
    }
}

pub fn create_test_restaurant(id: &str, tag: Option<&str>, total: Option<i32>) -> restaurant::Model {
    restaurant::Model {
        id: id.to_string(),
        name: format!("Restaurant {id}"),
        latitude: Some(40.7128),
        longitude: Some(-74.0060),
        total,
        active_rewards: json!([{"title": "Free Coffee", "description": "Any size"}]),
        nfc_tag_id: tag.map(ToString::to_string),
        logo_url: None,
        likes_count: 0,
        views_count: 0,
        created_at: Utc::now().into(),
    }
}

pub fn create_test_notification(
    id: &str,
    notification_type: NotificationType,
    from: &str,
    to: &str,
    minutes_ago: i64,
) -> notification::Model {
    let status = (notification_type == NotificationType::FollowRequest)
        .then_some(RequestStatus::Pending);
    notification::Model {
        id: id.to_string(),
        notification_type,
        from_user_id: from.to_string(),
        to_user_id: to.to_string(),
        message: format!("notification {id}"),
        status,
        is_read: false,
        created_at: (Utc::now() - chrono::Duration::minutes(minutes_ago)).into(),
    }
}

pub fn create_test_message(
    id: &str,
    from: &str,
    to: &str,
    text: &str,
    minutes_ago: i64,
) -> message::Model {
    message::Model {
        id: id.to_string(),
        chat_id: crate::conversation::chat_id(from, to),
        from_user_id: from.to_string(),
        to_user_id: to.to_string(),
        text: text.to_string(),
        is_read: false,
        created_at: (Utc::now() - chrono::Duration::minutes(minutes_ago)).into(),
    }
}
