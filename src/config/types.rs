//! Config types: database connection settings and server settings.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    3306
}

fn default_charset() -> String {
    "utf8mb4".into()
}

fn default_true() -> bool {
    true
}

fn default_min_size() -> u32 {
    1
}

fn default_max_size() -> u32 {
    10
}

/// MySQL connection and pool settings. Supplied once at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_true")]
    pub autocommit: bool,
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: default_host(),
            port: default_port(),
            user: None,
            password: None,
            database: None,
            charset: default_charset(),
            autocommit: true,
            min_size: default_min_size(),
            max_size: default_max_size(),
        }
    }
}

// Password stays out of logs.
impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("autocommit", &self.autocommit)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .finish()
    }
}

/// Credentials borrowed from a validated [`DbConfig`].
pub struct Credentials<'a> {
    pub user: &'a str,
    pub password: &'a str,
    pub database: &'a str,
}

impl DbConfig {
    /// User, password and database must be present; pool bounds must be ordered.
    pub fn validate(&self) -> Result<Credentials<'_>, ConfigError> {
        let user = self
            .user
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingCredential("user"))?;
        let password = self
            .password
            .as_deref()
            .ok_or(ConfigError::MissingCredential("password"))?;
        let database = self
            .database
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingCredential("database"))?;
        if self.max_size == 0 || self.min_size > self.max_size {
            return Err(ConfigError::InvalidSetting {
                key: "max_size".into(),
                message: format!("pool bounds [{}, {}] are not ordered", self.min_size, self.max_size),
            });
        }
        Ok(Credentials {
            user,
            password,
            database,
        })
    }
}

fn default_bind() -> String {
    "0.0.0.0:9000".into()
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            body_limit: default_body_limit(),
        }
    }
}

/// Whole application config: the merged default and override documents.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
}
