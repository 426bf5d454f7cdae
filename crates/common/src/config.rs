//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::storage::StorageConfig;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Loyalty and social behavior.
    #[serde(default)]
    pub punch: PunchConfig,
    /// Retry policy for idempotent reads.
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Local object storage for avatars and logos.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory files are written to.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// URL prefix files are served from.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
        }
    }
}

impl StorageSettings {
    /// Convert to the storage backend configuration.
    #[must_use]
    pub fn to_storage_config(&self) -> StorageConfig {
        StorageConfig::Local {
            base_path: self.base_path.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Loyalty program and inbox settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PunchConfig {
    /// Punches required when neither reward nor restaurant specify one.
    #[serde(default = "default_total")]
    pub default_total: i32,
    /// Sender id used by the built-in assistant.
    #[serde(default = "default_assistant_id")]
    pub assistant_id: String,
    /// Display name of the built-in assistant.
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    /// Payload marker identifying a peer-to-peer handshake tag.
    #[serde(default = "default_peer_marker")]
    pub peer_marker: String,
    /// Preview text for a conversation with no messages yet.
    #[serde(default = "default_placeholder")]
    pub empty_conversation_text: String,
    /// Maximum radius in miles for nearby restaurant queries.
    #[serde(default = "default_nearby_radius")]
    pub nearby_radius_miles: f64,
    /// Most recent items loaded per conversation when building the inbox.
    /// Unread items are always loaded on top of these.
    #[serde(default = "default_inbox_window")]
    pub inbox_window: u64,
}

impl Default for PunchConfig {
    fn default() -> Self {
        Self {
            default_total: default_total(),
            assistant_id: default_assistant_id(),
            assistant_name: default_assistant_name(),
            peer_marker: default_peer_marker(),
            empty_conversation_text: default_placeholder(),
            nearby_radius_miles: default_nearby_radius(),
            inbox_window: default_inbox_window(),
        }
    }
}

/// Retry settings, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Build the runtime retry policy.
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./files")
}

fn default_storage_url() -> String {
    "/files".to_string()
}

const fn default_total() -> i32 {
    10
}

fn default_assistant_id() -> String {
    "puncho".to_string()
}

fn default_assistant_name() -> String {
    "Puncho".to_string()
}

fn default_peer_marker() -> String {
    "punch:peer".to_string()
}

fn default_placeholder() -> String {
    "Say hi 👋".to_string()
}

const fn default_nearby_radius() -> f64 {
    25.0
}

const fn default_inbox_window() -> u64 {
    50
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_delay_ms() -> u64 {
    100
}

const fn default_max_delay_ms() -> u64 {
    2_000
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PUNCH_ENV`)
    /// 3. Environment variables with `PUNCH_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PUNCH_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PUNCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PUNCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:3000"

                [database]
                url = "postgres://localhost/punch"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.punch.default_total, 10);
        assert_eq!(config.punch.assistant_id, "puncho");
        assert_eq!(config.punch.empty_conversation_text, "Say hi 👋");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_retry_settings_to_policy() {
        let settings = RetrySettings {
            max_attempts: 5,
            initial_delay_ms: 50,
            max_delay_ms: 400,
        };
        let policy = settings.to_policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(50));
    }
}
