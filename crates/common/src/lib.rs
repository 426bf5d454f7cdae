//! Common utilities and shared types for Punch.
//!
//! This crate provides foundational components used across all Punch crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Retry**: Bounded exponential backoff for idempotent reads via [`RetryPolicy`]
//! - **Storage**: Object storage for avatars and restaurant logos
//!
//! # Example
//!
//! ```no_run
//! use punch_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Listening on {}:{} as {}", config.server.host, config.server.port, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod retry;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use retry::RetryPolicy;
pub use storage::{
    LocalStorage, StorageBackend, StorageConfig, UploadedFile, avatar_key, logo_key,
};
