//! Configuration management
//!
//! This module handles loading and parsing configuration for CineMatch.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Voting session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Catalog cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Join attempt throttling
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/cinematch.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Voting session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime, counted from creation
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    /// How many candidate codes to try before giving up on session creation
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,
    /// Maximum display name length (in characters)
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            max_code_attempts: default_max_code_attempts(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_max_code_attempts() -> u32 {
    32
}

fn default_max_name_length() -> usize {
    50
}

/// Catalog cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Throttling for failed join attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Failed joins tolerated per client IP within one window
    #[serde(default = "default_join_failures")]
    pub join_failures_per_window: usize,
    /// Sliding window length in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            join_failures_per_window: default_join_failures(),
            window_minutes: default_window_minutes(),
        }
    }
}

fn default_join_failures() -> usize {
    10
}

fn default_window_minutes() -> i64 {
    15
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid config value for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Longest session lifetime accepted from configuration (one year).
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    /// Values outside their accepted range are rejected.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - CINEMATCH_SERVER_HOST
    /// - CINEMATCH_SERVER_PORT
    /// - CINEMATCH_SERVER_CORS_ORIGIN
    /// - CINEMATCH_DATABASE_DRIVER
    /// - CINEMATCH_DATABASE_URL
    /// - CINEMATCH_SESSION_TTL_HOURS
    /// - CINEMATCH_CACHE_TTL_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Check the values the services rely on being in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, message: String| Err(ConfigError::InvalidValue { field, message });

        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session.ttl_hours) {
            return invalid(
                "session.ttl_hours",
                format!(
                    "must be between 1 and {}, got {}",
                    MAX_SESSION_TTL_HOURS, self.session.ttl_hours
                ),
            );
        }
        if self.session.max_code_attempts == 0 {
            return invalid("session.max_code_attempts", "must be at least 1".to_string());
        }
        if self.session.max_name_length == 0 {
            return invalid("session.max_name_length", "must be at least 1".to_string());
        }
        if self.rate_limit.join_failures_per_window == 0 {
            return invalid(
                "rate_limit.join_failures_per_window",
                "must be at least 1".to_string(),
            );
        }
        if self.rate_limit.window_minutes < 1 {
            return invalid(
                "rate_limit.window_minutes",
                format!("must be at least 1, got {}", self.rate_limit.window_minutes),
            );
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    /// Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CINEMATCH_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CINEMATCH_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("CINEMATCH_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("CINEMATCH_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("CINEMATCH_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("CINEMATCH_SESSION_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                if (1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
                    self.session.ttl_hours = ttl;
                }
            }
        }

        if let Ok(ttl) = std::env::var("CINEMATCH_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "CINEMATCH_SERVER_HOST",
    "CINEMATCH_SERVER_PORT",
    "CINEMATCH_SERVER_CORS_ORIGIN",
    "CINEMATCH_DATABASE_DRIVER",
    "CINEMATCH_DATABASE_URL",
    "CINEMATCH_SESSION_TTL_HOURS",
    "CINEMATCH_CACHE_TTL_SECONDS",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            1i64..=168,
            1u32..=64,
            1u64..=86400,
        )
            .prop_map(|(host, port, driver, ttl_hours, attempts, cache_ttl)| Config {
                server: ServerConfig {
                    host,
                    port,
                    cors_origin: default_cors_origin(),
                },
                database: DatabaseConfig {
                    driver,
                    url: default_database_url(),
                },
                session: SessionConfig {
                    ttl_hours,
                    max_code_attempts: attempts,
                    max_name_length: default_max_name_length(),
                },
                cache: CacheConfig {
                    ttl_seconds: cache_ttl,
                    max_capacity: default_max_capacity(),
                },
                rate_limit: RateLimitConfig::default(),
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Serializing a config and loading it back yields the same values.
        #[test]
        fn config_yaml_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let loaded = Config::load(file.path()).expect("Failed to load config");

            prop_assert_eq!(loaded.server.host, config.server.host);
            prop_assert_eq!(loaded.server.port, config.server.port);
            prop_assert_eq!(loaded.database.driver, config.database.driver);
            prop_assert_eq!(loaded.session.ttl_hours, config.session.ttl_hours);
            prop_assert_eq!(loaded.session.max_code_attempts, config.session.max_code_attempts);
            prop_assert_eq!(loaded.cache.ttl_seconds, config.cache.ttl_seconds);
        }
    }
}
