//! Load config from layered JSON documents or from the environment.

use crate::config::types::{AppConfig, DbConfig};
use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::path::Path;

/// Default document name inside the config directory.
pub const DEFAULT_CONFIG_FILE: &str = "config_default.json";
/// Optional override document; keys present here replace the defaults.
pub const OVERRIDE_CONFIG_FILE: &str = "config_override.json";

/// Deep-merge `override_` into `default`. Nested objects merge key by key; any other value in the
/// override replaces the default. Keys that only exist in the override are ignored.
pub fn merge(default: &Value, override_: &Value) -> Value {
    match (default, override_) {
        (Value::Object(d), Value::Object(o)) => {
            let mut out = Map::with_capacity(d.len());
            for (k, v) in d {
                let merged = match o.get(k) {
                    Some(ov) if v.is_object() => merge(v, ov),
                    Some(ov) => ov.clone(),
                    None => v.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        (_, o) => o.clone(),
    }
}

impl AppConfig {
    /// Build config from a default document and an optional override document.
    pub fn from_documents(default: &Value, override_: Option<&Value>) -> Result<Self, ConfigError> {
        let merged = match override_ {
            Some(o) => merge(default, o),
            None => default.clone(),
        };
        serde_json::from_value(merged).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Read `config_default.json` (required) and `config_override.json` (optional) from `dir`.
    pub async fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let default_path = dir.join(DEFAULT_CONFIG_FILE);
        let default_text = tokio::fs::read_to_string(&default_path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", default_path.display(), e)))?;
        let default: Value = serde_json::from_str(&default_text)
            .map_err(|e| ConfigError::Load(format!("{}: {}", default_path.display(), e)))?;

        let override_path = dir.join(OVERRIDE_CONFIG_FILE);
        let override_ = match tokio::fs::read_to_string(&override_path).await {
            Ok(text) => Some(
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| ConfigError::Load(format!("{}: {}", override_path.display(), e)))?,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ConfigError::Load(format!("{}: {}", override_path.display(), e))),
        };
        if override_.is_some() {
            tracing::info!(path = %override_path.display(), "applying config override");
        }
        Self::from_documents(&default, override_.as_ref())
    }
}

impl DbConfig {
    /// Settings from `DB_*` environment variables (after loading `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env_with_prefix("DB_")
    }

    /// Settings from `<prefix>HOST`, `<prefix>PORT`, `<prefix>USER`, `<prefix>PASSWORD`, `<prefix>NAME`,
    /// `<prefix>CHARSET`, `<prefix>AUTOCOMMIT`, `<prefix>POOL_MIN`, `<prefix>POOL_MAX`.
    /// Unset variables keep their defaults.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let var = |name: &str| std::env::var(format!("{}{}", prefix, name)).ok();
        let mut cfg = DbConfig::default();
        if let Some(v) = var("HOST") {
            cfg.host = v;
        }
        if let Some(v) = var("PORT") {
            cfg.port = parse_setting(prefix, "PORT", &v)?;
        }
        cfg.user = var("USER");
        cfg.password = var("PASSWORD");
        cfg.database = var("NAME");
        if let Some(v) = var("CHARSET") {
            cfg.charset = v;
        }
        if let Some(v) = var("AUTOCOMMIT") {
            cfg.autocommit = parse_bool(&v).ok_or_else(|| ConfigError::InvalidSetting {
                key: format!("{}AUTOCOMMIT", prefix),
                message: format!("expected true/false, got '{}'", v),
            })?;
        }
        if let Some(v) = var("POOL_MIN") {
            cfg.min_size = parse_setting(prefix, "POOL_MIN", &v)?;
        }
        if let Some(v) = var("POOL_MAX") {
            cfg.max_size = parse_setting(prefix, "POOL_MAX", &v)?;
        }
        Ok(cfg)
    }
}

fn parse_setting<T: std::str::FromStr>(prefix: &str, name: &str, v: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    v.trim().parse().map_err(|e: T::Err| ConfigError::InvalidSetting {
        key: format!("{}{}", prefix, name),
        message: e.to_string(),
    })
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
