//! Follow relationship states and profile visibility rules.

use punch_db::entities::user;
use serde::{Deserialize, Serialize};

/// State of the directed relationship from one user to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowState {
    None,
    Pending,
    Following,
}

/// A section of a profile that its owner can hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivacyFacet {
    StoresVisited,
    LikedRestaurants,
    Followers,
    Following,
    History,
}

impl PrivacyFacet {
    pub const ALL: [Self; 5] = [
        Self::StoresVisited,
        Self::LikedRestaurants,
        Self::Followers,
        Self::Following,
        Self::History,
    ];

    /// Whether the owner has this facet switched on.
    #[must_use]
    pub const fn is_shown_by(self, owner: &user::Model) -> bool {
        match self {
            Self::StoresVisited => owner.show_stores_visited,
            Self::LikedRestaurants => owner.show_liked_restaurants,
            Self::Followers => owner.show_followers,
            Self::Following => owner.show_following,
            Self::History => owner.show_history,
        }
    }
}

/// Whether `viewer_id` may see `facet` on `subject`'s profile.
///
/// Owners always see their own profile. Anyone else needs the facet switched
/// on, and for a private profile must also be a follower.
#[must_use]
pub fn can_view_facet(
    viewer_id: Option<&str>,
    subject: &user::Model,
    viewer_follows_subject: bool,
    facet: PrivacyFacet,
) -> bool {
    if viewer_id == Some(subject.id.as_str()) {
        return true;
    }

    if !facet.is_shown_by(subject) {
        return false;
    }

    !subject.is_private() || (viewer_id.is_some() && viewer_follows_subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{create_private_user, create_test_user};

    #[test]
    fn test_owner_sees_everything() {
        let mut owner = create_private_user("u1", "owner");
        owner.show_history = false;

        for facet in PrivacyFacet::ALL {
            assert!(can_view_facet(Some("u1"), &owner, false, facet));
        }
    }

    #[test]
    fn test_public_profile_respects_flags() {
        let mut subject = create_test_user("u2", "bob");
        subject.show_liked_restaurants = false;

        assert!(can_view_facet(None, &subject, false, PrivacyFacet::Followers));
        assert!(!can_view_facet(
            Some("u1"),
            &subject,
            true,
            PrivacyFacet::LikedRestaurants
        ));
    }

    #[test]
    fn test_private_profile_requires_follow() {
        let subject = create_private_user("u2", "bob");

        assert!(!can_view_facet(Some("u1"), &subject, false, PrivacyFacet::History));
        assert!(!can_view_facet(None, &subject, true, PrivacyFacet::History));
        assert!(can_view_facet(Some("u1"), &subject, true, PrivacyFacet::History));
    }

    #[test]
    fn test_follow_state_serializes_lowercase() {
        let json = serde_json::to_string(&FollowState::Pending).unwrap_or_default();
        assert_eq!(json, "\"pending\"");
    }
}
