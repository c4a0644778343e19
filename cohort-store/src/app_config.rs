use cohort_core::retry::RetryPolicy;
use cohort_order::FulfillmentSettings;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// No url means the process keeps everything in memory.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

/// No url disables rate limiting.
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 120 }

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FulfillmentConfig {
    #[serde(default = "default_commit_attempts")]
    pub max_commit_attempts: usize,
    #[serde(default = "default_instructions_len")]
    pub instructions_max_len: usize,
}

fn default_commit_attempts() -> usize { 3 }
fn default_instructions_len() -> usize { 2_000 }

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: default_commit_attempts(),
            instructions_max_len: default_instructions_len(),
        }
    }
}

impl FulfillmentConfig {
    pub fn settings(&self) -> FulfillmentSettings {
        FulfillmentSettings {
            max_commit_attempts: self.max_commit_attempts,
            instructions_max_len: self.instructions_max_len,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Relay endpoint. Notifications are only logged without it.
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub operator_emails: Vec<String>,
    #[serde(default = "default_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_attempts() -> usize { 3 }
fn default_base_delay() -> u64 { 500 }
fn default_max_delay() -> u64 { 8_000 }

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            operator_emails: Vec::new(),
            max_attempts: default_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl NotificationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_delay_ms, self.max_delay_ms, 0.2)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_sweep")]
    pub expiry_sweep_seconds: u64,
}

fn default_sweep() -> u64 { 300 }

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { expiry_sweep_seconds: default_sweep() }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `COHORT__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("COHORT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "test-secret"
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.database.url.is_none());
        assert!(config.notifications.webhook_url.is_none());
        assert_eq!(config.fulfillment.settings().max_commit_attempts, 3);
        assert_eq!(config.fulfillment.instructions_max_len, 2_000);
        assert_eq!(config.notifications.retry_policy().max_attempts, 3);
        assert_eq!(config.workers.expiry_sweep_seconds, 300);
    }
}
