//! Environment-driven configuration for the API process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

/// Secret used when `JWT_SECRET` is unset. Fine for local runs only.
pub const INSECURE_DEFAULT_JWT_SECRET: &str = "dev-insecure-secret-change-me";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
pub const DEFAULT_EMAIL_STREAM_KEY: &str = "movierent:email";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub redis_url: String,
    pub email_stream_key: String,
    pub rental_code_length: usize,
    pub image_storage_dir: PathBuf,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set; using an insecure development secret");
                INSECURE_DEFAULT_JWT_SECRET.to_string()
            }
        };

        let use_persistent_stores = parse_bool("USE_PERSISTENT_STORES", get("USE_PERSISTENT_STORES"), false)?;
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let rental_code_length: usize = parse("RENTAL_CODE_LENGTH", get("RENTAL_CODE_LENGTH"), 8)?;
        if rental_code_length == 0 {
            return Err(ConfigError::Invalid {
                key: "RENTAL_CODE_LENGTH",
                value: "0".to_string(),
            });
        }

        let jwt_ttl_minutes: i64 = parse("JWT_TTL_MINUTES", get("JWT_TTL_MINUTES"), 60)?;
        if jwt_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_TTL_MINUTES",
                value: jwt_ttl_minutes.to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse(
                "BIND_ADDR",
                get("BIND_ADDR"),
                SocketAddr::from(([0, 0, 0, 0], 8080)),
            )?,
            jwt_secret,
            jwt_ttl_minutes,
            use_persistent_stores,
            database_url,
            redis_url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            email_stream_key: get("EMAIL_STREAM_KEY").unwrap_or_else(|| DEFAULT_EMAIL_STREAM_KEY.to_string()),
            rental_code_length,
            image_storage_dir: PathBuf::from(get("IMAGE_STORAGE_DIR").unwrap_or_else(|| "images".to_string())),
            seed_demo_data: parse_bool("SEED_DEMO_DATA", get("SEED_DEMO_DATA"), true)?,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: raw.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.jwt_secret, INSECURE_DEFAULT_JWT_SECRET);
        assert_eq!(cfg.jwt_ttl_minutes, 60);
        assert!(!cfg.use_persistent_stores);
        assert_eq!(cfg.email_stream_key, "movierent:email");
        assert_eq!(cfg.rental_code_length, 8);
        assert_eq!(cfg.image_storage_dir, PathBuf::from("images"));
        assert!(cfg.seed_demo_data);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("RENTAL_CODE_LENGTH", "12"),
            ("SEED_DEMO_DATA", "off"),
            ("USE_PERSISTENT_STORES", "TRUE"),
            ("DATABASE_URL", "postgres://localhost/movies"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.rental_code_length, 12);
        assert!(!cfg.seed_demo_data);
        assert!(cfg.use_persistent_stores);
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(matches!(
            config(&[("RENTAL_CODE_LENGTH", "eight")]),
            Err(ConfigError::Invalid { key: "RENTAL_CODE_LENGTH", .. })
        ));
        assert!(config(&[("RENTAL_CODE_LENGTH", "0")]).is_err());
        assert!(config(&[("SEED_DEMO_DATA", "maybe")]).is_err());
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
    }
}
