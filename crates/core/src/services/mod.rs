//! Business logic services.

#![allow(missing_docs)]

pub mod change_feed;
pub mod conversation;
pub mod event_publisher;
pub mod following;
pub mod messaging;
pub mod notification;
pub mod punch;
pub mod restaurant;
pub mod tag;
pub mod user;

pub use change_feed::{ChangeHub, Subscription};
pub use conversation::ConversationService;
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher, StreamEvent};
pub use following::{FollowingService, Relationship, RequestResponse};
pub use messaging::MessagingService;
pub use notification::NotificationService;
pub use punch::{CardView, PunchOutcome, PunchService, Redemption};
pub use restaurant::{CreateRestaurantInput, NearbyRestaurant, RestaurantService};
pub use tag::TagResolverService;
pub use user::{SignupInput, UpdatePrivacyInput, UpdateProfileInput, UserProfile, UserService};
