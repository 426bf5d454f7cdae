//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    #[sea_orm(string_value = "followRequest")]
    FollowRequest,
    #[sea_orm(string_value = "followRequestAccepted")]
    FollowRequestAccepted,
    #[sea_orm(string_value = "followApproved")]
    FollowApproved,
    #[sea_orm(string_value = "followDenied")]
    FollowDenied,
    #[sea_orm(string_value = "punchoIntro")]
    PunchoIntro,
    #[sea_orm(string_value = "punchoReply")]
    PunchoReply,
    #[sea_orm(string_value = "followSuggestion")]
    FollowSuggestion,
}

impl NotificationType {
    /// Types shown in the assistant conversation.
    pub const ASSISTANT_THREAD: [Self; 6] = [
        Self::PunchoIntro,
        Self::PunchoReply,
        Self::FollowRequestAccepted,
        Self::FollowApproved,
        Self::FollowDenied,
        Self::FollowSuggestion,
    ];

    /// Whether notifications of this type belong in the assistant conversation.
    #[must_use]
    pub fn in_assistant_thread(self) -> bool {
        Self::ASSISTANT_THREAD.contains(&self)
    }
}

/// Resolution state of a follow request notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "denied")]
    Denied,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub notification_type: NotificationType,

    /// Sender; a user id or the assistant id
    pub from_user_id: String,

    /// Recipient; a user id or the assistant id
    pub to_user_id: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Only set on follow requests
    #[sea_orm(nullable)]
    pub status: Option<RequestStatus>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
