//! Restaurant entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One entry of a restaurant's reward catalog, stored as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDefinition {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub punches_required: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "restaurant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(nullable)]
    pub latitude: Option<f64>,

    #[sea_orm(nullable)]
    pub longitude: Option<f64>,

    /// Punches per card; unset means the configured default
    #[sea_orm(nullable)]
    pub total: Option<i32>,

    /// Reward catalog (`Vec<RewardDefinition>`)
    #[sea_orm(column_type = "JsonBinary")]
    pub active_rewards: Json,

    /// NFC tag bound to this restaurant; never serialized
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub nfc_tag_id: Option<String>,

    #[sea_orm(nullable)]
    pub logo_url: Option<String>,

    #[sea_orm(default_value = 0)]
    pub likes_count: i32,

    #[sea_orm(default_value = 0)]
    pub views_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::punch_card::Entity")]
    PunchCards,
}

impl Related<super::punch_card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PunchCards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the reward catalog.
    pub fn rewards(&self) -> Result<Vec<RewardDefinition>, serde_json::Error> {
        if self.active_rewards.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(self.active_rewards.clone())
    }

    /// Both coordinates, when the restaurant has a location.
    #[must_use]
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}
