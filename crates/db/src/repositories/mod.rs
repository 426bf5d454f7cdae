//! Database repositories.

pub mod conversation;
pub mod follow_request;
pub mod following;
pub mod message;
pub mod notification;
pub mod punch_card;
pub mod restaurant;
pub mod restaurant_like;
pub mod reward_history;
pub mod user;

pub use conversation::{ConversationRepository, MarkedRead};
pub use follow_request::FollowRequestRepository;
pub use following::FollowingRepository;
pub use message::MessageRepository;
pub use notification::NotificationRepository;
pub use punch_card::PunchCardRepository;
pub use restaurant::RestaurantRepository;
pub use restaurant_like::RestaurantLikeRepository;
pub use reward_history::RewardHistoryRepository;
pub use user::UserRepository;
