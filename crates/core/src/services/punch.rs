//! Punch ledger service.
//!
//! Scans are resolved to a restaurant and applied with a capped atomic
//! increment, so a card never exceeds its total and completion is reported
//! exactly once.

use std::collections::HashMap;

use punch_common::{AppError, AppResult, IdGenerator};
use punch_db::{
    entities::{punch_card, restaurant, reward_history},
    repositories::{
        PunchCardRepository, RestaurantRepository, RewardHistoryRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Serialize;

use crate::rewards::{self, RewardStatus, card_total, required_punches};
use crate::services::event_publisher::{EventPublisherService, StreamEvent};
use crate::services::tag::TagResolverService;
use crate::session::Session;

/// Title used when a completed card's restaurant has no readable catalog.
const FALLBACK_REWARD_TITLE: &str = "your reward";

/// Result of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum PunchOutcome {
    /// A punch was added and the card is not yet full.
    #[serde(rename_all = "camelCase")]
    PunchAdded {
        restaurant_id: String,
        count: i32,
        total: i32,
        remaining: i32,
    },
    /// This punch filled the card.
    #[serde(rename_all = "camelCase")]
    CardComplete {
        restaurant_id: String,
        reward_title: String,
        total: i32,
    },
    /// The card was already full; nothing changed.
    #[serde(rename_all = "camelCase")]
    AlreadyComplete { restaurant_id: String, total: i32 },
}

/// A punch card with its evaluated rewards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub count: i32,
    pub total: i32,
    pub rewards: Vec<RewardStatus>,
}

/// A claimed reward.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub record: reward_history::Model,
    /// Punches left on the card after the claim
    pub count: i32,
}

/// Punch ledger service for business logic.
#[derive(Clone)]
pub struct PunchService {
    punch_card_repo: PunchCardRepository,
    restaurant_repo: RestaurantRepository,
    user_repo: UserRepository,
    reward_history_repo: RewardHistoryRepository,
    tag_resolver: TagResolverService,
    event_publisher: Option<EventPublisherService>,
    default_total: i32,
    id_gen: IdGenerator,
}

impl PunchService {
    /// Create a new punch service.
    #[must_use]
    pub const fn new(
        punch_card_repo: PunchCardRepository,
        restaurant_repo: RestaurantRepository,
        user_repo: UserRepository,
        reward_history_repo: RewardHistoryRepository,
        tag_resolver: TagResolverService,
        default_total: i32,
    ) -> Self {
        Self {
            punch_card_repo,
            restaurant_repo,
            user_repo,
            reward_history_repo,
            tag_resolver,
            event_publisher: None,
            default_total,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Record a scan of `tag_id` for the session's user.
    pub async fn record_scan(&self, session: &Session, tag_id: &str) -> AppResult<PunchOutcome> {
        let user_id = session.require_user()?;

        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Err(AppError::ProfileNotFound(user_id.to_string()));
        }

        let restaurant = self
            .tag_resolver
            .find_restaurant(tag_id)
            .await?
            .ok_or_else(|| AppError::RestaurantNotFound(format!("tag {tag_id}")))?;

        let total = card_total(restaurant.total, self.default_total);

        let new_count = self
            .punch_card_repo
            .increment_capped(&self.id_gen.generate(), user_id, &restaurant.id, total)
            .await?;

        let Some(count) = new_count else {
            tracing::debug!(user_id = %user_id, restaurant_id = %restaurant.id, "Card already complete");
            return Ok(PunchOutcome::AlreadyComplete {
                restaurant_id: restaurant.id,
                total,
            });
        };

        tracing::info!(
            user_id = %user_id,
            restaurant_id = %restaurant.id,
            count,
            total,
            "Punch recorded"
        );

        self.publish(StreamEvent::PunchCardChanged {
            user_id: user_id.to_string(),
            restaurant_id: restaurant.id.clone(),
            count,
        })
        .await;

        if count >= total {
            return Ok(PunchOutcome::CardComplete {
                reward_title: first_reward_title(&restaurant),
                restaurant_id: restaurant.id,
                total,
            });
        }

        Ok(PunchOutcome::PunchAdded {
            restaurant_id: restaurant.id,
            count,
            total,
            remaining: total - count,
        })
    }

    /// The session user's card at one restaurant.
    pub async fn card(&self, session: &Session, restaurant_id: &str) -> AppResult<CardView> {
        let user_id = session.require_user()?;
        let restaurant = self.restaurant_repo.get_by_id(restaurant_id).await?;
        let count = self.punch_card_repo.count(user_id, restaurant_id).await?;

        self.card_view(&restaurant, count)
    }

    /// Rewards at one restaurant for the session user's count.
    pub async fn rewards(
        &self,
        session: &Session,
        restaurant_id: &str,
    ) -> AppResult<Vec<RewardStatus>> {
        Ok(self.card(session, restaurant_id).await?.rewards)
    }

    /// Every card the session user holds.
    ///
    /// Cards whose restaurant has a malformed catalog are listed without rewards.
    pub async fn wallet(&self, session: &Session) -> AppResult<Vec<CardView>> {
        let user_id = session.require_user()?;
        let cards = self.punch_card_repo.find_by_user(user_id).await?;

        let ids: Vec<String> = cards.iter().map(|c| c.restaurant_id.clone()).collect();
        let restaurants: HashMap<String, restaurant::Model> = self
            .restaurant_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        Ok(cards
            .iter()
            .filter_map(|card: &punch_card::Model| {
                let restaurant = restaurants.get(&card.restaurant_id)?;
                let view = self.card_view(restaurant, card.count).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, restaurant_id = %restaurant.id, "Skipping rewards");
                    CardView {
                        restaurant_id: restaurant.id.clone(),
                        restaurant_name: restaurant.name.clone(),
                        count: card.count,
                        total: card_total(restaurant.total, self.default_total),
                        rewards: vec![],
                    }
                });
                Some(view)
            })
            .collect())
    }

    /// Claim the reward at `reward_index` of a restaurant's catalog.
    pub async fn redeem(
        &self,
        session: &Session,
        restaurant_id: &str,
        reward_index: usize,
    ) -> AppResult<Redemption> {
        let user_id = session.require_user()?;
        let restaurant = self.restaurant_repo.get_by_id(restaurant_id).await?;

        let catalog = restaurant.rewards().map_err(|e| {
            AppError::Validation(format!("Invalid reward catalog for {restaurant_id}: {e}"))
        })?;
        let reward = catalog
            .get(reward_index)
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_index}")))?;

        let required = required_punches(reward, restaurant.total, self.default_total);

        let history = reward_history::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            restaurant_id: Set(restaurant_id.to_string()),
            reward_title: Set(reward.title.clone()),
            punches_spent: Set(required),
            claimed_at: Set(chrono::Utc::now().into()),
        };

        let (count, record) = self
            .punch_card_repo
            .redeem(user_id, restaurant_id, required, history)
            .await?
            .ok_or_else(|| AppError::BadRequest("reward not yet available".to_string()))?;

        tracing::info!(
            user_id = %user_id,
            restaurant_id = %restaurant_id,
            reward = %record.reward_title,
            "Reward redeemed"
        );

        self.publish(StreamEvent::PunchCardChanged {
            user_id: user_id.to_string(),
            restaurant_id: restaurant_id.to_string(),
            count,
        })
        .await;

        Ok(Redemption { record, count })
    }

    /// The session user's claimed rewards, newest first.
    pub async fn history(
        &self,
        session: &Session,
        limit: u64,
    ) -> AppResult<Vec<reward_history::Model>> {
        let user_id = session.require_user()?;
        self.reward_history_repo.find_by_user(user_id, limit).await
    }

    fn card_view(&self, restaurant: &restaurant::Model, count: i32) -> AppResult<CardView> {
        Ok(CardView {
            restaurant_id: restaurant.id.clone(),
            restaurant_name: restaurant.name.clone(),
            count,
            total: card_total(restaurant.total, self.default_total),
            rewards: rewards::evaluate(restaurant, count, self.default_total)?,
        })
    }

    async fn publish(&self, event: StreamEvent) {
        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher.publish(event).await
        {
            tracing::warn!(error = %e, "Failed to publish punch event");
        }
    }
}

fn first_reward_title(restaurant: &restaurant::Model) -> String {
    match restaurant.rewards() {
        Ok(catalog) => catalog
            .into_iter()
            .next()
            .map_or_else(|| FALLBACK_REWARD_TITLE.to_string(), |r| r.title),
        Err(e) => {
            tracing::warn!(error = %e, restaurant_id = %restaurant.id, "Unreadable reward catalog");
            FALLBACK_REWARD_TITLE.to_string()
        }
    }
}
