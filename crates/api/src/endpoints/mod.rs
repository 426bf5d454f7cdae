//! API endpoints.

mod auth;
mod conversations;
mod following;
mod health;
mod messaging;
mod notifications;
mod punch;
mod restaurants;
mod upload;
mod users;

use axum::Router;

use crate::middleware::AppState;

pub use health::router as health_router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/restaurants", restaurants::router())
        .nest("/punch", punch::router())
        .nest("/following", following::router())
        .nest("/notifications", notifications::router())
        .nest("/messaging", messaging::router())
        .nest("/conversations", conversations::router())
}
