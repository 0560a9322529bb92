//! # Service Configuration
//!
//! Settings are read from a TOML file; every field has a default, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! [server]
//! port = 8080
//! filepath_root = "."
//!
//! [database]
//! path = "database.json"
//!
//! [auth]
//! jwt_secret = "change-me"
//! polka_key = "change-me-too"
//! access_ttl_secs = 3600
//! refresh_ttl_secs = 5184000
//! revoke_access_tokens = false
//!
//! [chirps]
//! max_length = 140
//! banned_words = ["kerfuffle", "sharbert", "fornax"]
//! ```
//!
//! `JWT_SECRET` and `POLKA_KEY` in the environment override the file. A
//! `.env` file in the working directory is loaded into the environment first;
//! variables already set in the process are not replaced.

use crate::auth::TokenPolicy;
use crate::repository::{default_banned_words, ChirpPolicy, MAX_CHIRP_LENGTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chirps: ChirpsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served under `/app`.
    #[serde(default = "default_filepath_root")]
    pub filepath_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            filepath_root: default_filepath_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    /// API key expected from the payment provider's webhook.
    #[serde(default)]
    pub polka_key: Option<String>,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default)]
    pub revoke_access_tokens: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            polka_key: None,
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            revoke_access_tokens: false,
        }
    }
}

impl AuthConfig {
    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            access_ttl: Duration::from_secs(self.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.refresh_ttl_secs),
            revoke_access_tokens: self.revoke_access_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChirpsConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_banned_words")]
    pub banned_words: Vec<String>,
}

impl Default for ChirpsConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            banned_words: default_banned_words(),
        }
    }
}

impl ChirpsConfig {
    pub fn policy(&self) -> ChirpPolicy {
        ChirpPolicy::new(self.max_length, self.banned_words.clone())
    }
}

impl Config {
    /// Apply `JWT_SECRET` / `POLKA_KEY` from the environment, if set.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("JWT_SECRET").ok(),
            std::env::var("POLKA_KEY").ok(),
        );
    }

    fn apply_overrides(&mut self, jwt_secret: Option<String>, polka_key: Option<String>) {
        if let Some(secret) = jwt_secret.filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = polka_key.filter(|k| !k.is_empty()) {
            self.auth.polka_key = Some(key);
        }
    }
}

/// Load `KEY=value` lines from `path` into the process environment. A missing
/// or unreadable file is not an error; returns whether anything was loaded.
pub fn load_dotenv(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => {
            tracing::info!("Loaded environment from {}", path.display());
            true
        }
        Err(e) => {
            tracing::debug!("No environment file at {}: {}", path.display(), e);
            false
        }
    }
}

// Default value functions
fn default_port() -> u16 { 8080 }
fn default_filepath_root() -> PathBuf { PathBuf::from(".") }
fn default_database_path() -> PathBuf { PathBuf::from("database.json") }
fn default_access_ttl_secs() -> u64 { 3600 }
fn default_refresh_ttl_secs() -> u64 { 5_184_000 }
fn default_max_length() -> usize { MAX_CHIRP_LENGTH }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}
