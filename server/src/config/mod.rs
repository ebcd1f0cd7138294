use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{ExchangeError, Result};

const MIN_SIGNING_KEY_LEN: usize = 32;
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub signing_key: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_admin_prefixes")]
    pub admin_prefixes: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage_url() -> String {
    "sqlite://exchange.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_query_timeout_secs() -> u64 {
    15
}

fn default_token_ttl_hours() -> u64 {
    12
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_admin_prefixes() -> Vec<String> {
    vec!["/api/admin".to_string()]
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
            max_connections: default_max_connections(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            admin_prefixes: default_admin_prefixes(),
        }
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_hours.saturating_mul(3600))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl ServerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ExchangeError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ExchangeError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Lets deployment environment variables win over the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.listen.host = host;
        }
        if let Some(port) = env_parsed("SERVER_PORT")? {
            self.listen.port = port;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.storage.url = url;
        }
        if let Ok(key) = std::env::var("TOKEN_SIGNING_KEY") {
            self.auth.signing_key = key;
        }
        if let Some(hours) = env_parsed("TOKEN_TTL_HOURS")? {
            self.auth.token_ttl_hours = hours;
        }
        if let Some(secs) = env_parsed("SWEEP_INTERVAL_SECS")? {
            self.auth.sweep_interval_secs = secs;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ExchangeError::Config(format!(
                "auth.signing_key must be at least {} bytes",
                MIN_SIGNING_KEY_LEN
            )));
        }
        if self.auth.token_ttl_hours == 0 || self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ExchangeError::Config(format!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        if self.auth.sweep_interval_secs == 0 {
            return Err(ExchangeError::Config(
                "auth.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if self.storage.query_timeout_secs == 0 {
            return Err(ExchangeError::Config(
                "storage.query_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ExchangeError::Config(format!("{} has an invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
