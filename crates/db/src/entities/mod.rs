//! Database entities.

#![allow(missing_docs)]

pub mod follow_request;
pub mod following;
pub mod message;
pub mod notification;
pub mod punch_card;
pub mod restaurant;
pub mod restaurant_like;
pub mod reward_history;
pub mod user;

pub use follow_request::Entity as FollowRequest;
pub use following::Entity as Following;
pub use message::Entity as Message;
pub use notification::Entity as Notification;
pub use punch_card::Entity as PunchCard;
pub use restaurant::Entity as Restaurant;
pub use restaurant_like::Entity as RestaurantLike;
pub use reward_history::Entity as RewardHistory;
pub use user::Entity as User;
