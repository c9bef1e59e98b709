use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub push: PushConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

impl AuthConfig {
    pub fn token_lifetime(&self) -> Result<chrono::Duration, config::ConfigError> {
        seconds("auth.jwt_expiration_seconds", self.jwt_expiration_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Pending bookings older than this are released. Unset disables expiry.
    pub pending_booking_ttl_seconds: Option<u64>,
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_seconds: u64,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            pending_booking_ttl_seconds: None,
            reaper_interval_seconds: default_reaper_interval(),
        }
    }
}

impl BusinessRules {
    pub fn pending_booking_ttl(&self) -> Result<Option<chrono::Duration>, config::ConfigError> {
        self.pending_booking_ttl_seconds
            .map(|ttl| seconds("business_rules.pending_booking_ttl_seconds", ttl))
            .transpose()
    }
}

fn default_reaper_interval() -> u64 { 60 }

fn seconds(field: &str, value: u64) -> Result<chrono::Duration, config::ConfigError> {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| config::ConfigError::Message(format!("{} is out of range: {}", field, value)))
}

#[derive(Debug, Deserialize, Clone)]
pub struct PushConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self { channel_capacity: default_channel_capacity() }
    }
}

fn default_channel_capacity() -> usize { 256 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked developer overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TRANSIT__SERVER__PORT=9000`
            .add_source(
                config::Environment::with_prefix("TRANSIT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
