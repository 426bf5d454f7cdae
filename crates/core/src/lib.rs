//! Core business logic for Punch.
//!
//! The pure building blocks live at the crate root:
//!
//! - [`geo`]: Haversine distance and display formatting
//! - [`rewards`]: reward availability and progress for a punch count
//! - [`social`]: follow states and privacy facet gating
//! - [`conversation`]: unified inbox aggregation
//! - [`tag`]: NFC payload decoding and reader sessions
//! - [`session`]: the authenticated caller
//!
//! [`services`] wires them to the repositories of `punch-db`.

pub mod conversation;
pub mod geo;
pub mod rewards;
pub mod services;
pub mod session;
pub mod social;
pub mod tag;

#[cfg(test)]
pub(crate) mod testing;

pub use services::*;
pub use session::Session;
