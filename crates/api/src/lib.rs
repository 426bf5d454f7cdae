//! HTTP API layer for Punch.
//!
//! This crate provides the REST API and the live inbox stream:
//!
//! - **Endpoints**: accounts, restaurants, punch cards, social graph, inbox
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: application state and token resolution
//! - **SSE**: conversation snapshots pushed on every change
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::{health_router, router};
pub use middleware::{AppState, auth_middleware};
