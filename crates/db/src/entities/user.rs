//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Who may see a user's profile facets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    #[default]
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "private")]
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique handle, compared case-sensitively
    #[sea_orm(unique)]
    pub username: String,

    /// Display name
    #[sea_orm(nullable)]
    pub name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Bearer token
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub token: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password: String,

    /// Followers count (denormalized)
    #[sea_orm(default_value = 0)]
    pub followers_count: i32,

    /// Following count (denormalized)
    #[sea_orm(default_value = 0)]
    pub following_count: i32,

    pub profile_visibility: ProfileVisibility,

    #[sea_orm(default_value = true)]
    pub show_stores_visited: bool,

    #[sea_orm(default_value = true)]
    pub show_liked_restaurants: bool,

    #[sea_orm(default_value = true)]
    pub show_followers: bool,

    #[sea_orm(default_value = true)]
    pub show_following: bool,

    #[sea_orm(default_value = true)]
    pub show_history: bool,

    /// May manage restaurants and NFC bindings
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::punch_card::Entity")]
    PunchCards,

    #[sea_orm(has_many = "super::restaurant_like::Entity")]
    Likes,
}

impl Related<super::punch_card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PunchCards.def()
    }
}

impl Related<super::restaurant_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the profile is restricted to followers.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.profile_visibility == ProfileVisibility::Private
    }
}
