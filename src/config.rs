//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct,
//! then validates the values that the prediction pipeline depends on.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HS256 secret for dashboard tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `MODEL_SERVICE_URL` (optional): base URL of the inference service
/// - `MODEL_TIMEOUT_SECS` (optional): hard deadline of one model call, 1-9 seconds
/// - `MODEL_VERSION` (optional): version tag recorded when the model omits one
/// - `DB_MAX_CONNECTIONS` (optional): bounded pool size
/// - `JWT_EXPIRY_MINS` (optional): lifetime of issued dashboard tokens
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub jwt_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_model_service_url")]
    pub model_service_url: String,

    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_model_version")]
    pub model_version: String,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_jwt_expiry_mins")]
    pub jwt_expiry_mins: i64,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_port() -> u16 {
    3000
}

fn default_model_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_model_timeout_secs() -> u64 {
    5
}

fn default_model_version() -> String {
    "1.0".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_jwt_expiry_mins() -> i64 {
    60
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - A value parses but is out of range (see [`Config::validate`])
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the pipeline relies on.
    ///
    /// The model timeout bounds how long a database transaction may stay
    /// open across the model call, so it is kept in single-digit seconds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET must not be empty".into()));
        }

        let parsed = url::Url::parse(&self.model_service_url).map_err(|e| {
            ConfigError::Invalid(format!("MODEL_SERVICE_URL is not a valid URL: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "MODEL_SERVICE_URL must use http or https".into(),
            ));
        }

        if !(1..=9).contains(&self.model_timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "MODEL_TIMEOUT_SECS must be between 1 and 9, got {}",
                self.model_timeout_secs
            )));
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid(
                "DB_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }

        Ok(())
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/threats".into(),
            jwt_secret: "secret".into(),
            server_port: default_port(),
            model_service_url: default_model_service_url(),
            model_timeout_secs: default_model_timeout_secs(),
            model_version: default_model_version(),
            db_max_connections: default_max_connections(),
            jwt_expiry_mins: default_jwt_expiry_mins(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.model_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_timeout_outside_single_digit_seconds() {
        let mut config = base_config();
        config.model_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.model_timeout_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_http_model_url() {
        let mut config = base_config();
        config.model_service_url = "ftp://models.internal".into();
        assert!(config.validate().is_err());

        config.model_service_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_blank_jwt_secret() {
        let mut config = base_config();
        config.jwt_secret = "   ".into();
        assert!(config.validate().is_err());
    }
}
