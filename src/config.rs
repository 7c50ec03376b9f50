use std::str::FromStr;

use thiserror::Error;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub database_url: String,
    // caching is off when unset
    pub redis_url: Option<String>,
    pub bind_address: String,
    pub port: u16,
    pub db_pool_max_size: u32,
    pub cache_ttl_seconds: u64,
}

impl Settings {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Settings {
            database_url: non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            redis_url: non_empty("REDIS_URL"),
            bind_address: non_empty("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: parse_or(non_empty("PORT"), "PORT", DEFAULT_PORT)?,
            db_pool_max_size: parse_or(
                non_empty("DB_POOL_MAX_SIZE"),
                "DB_POOL_MAX_SIZE",
                DEFAULT_DB_POOL_MAX_SIZE,
            )?,
            cache_ttl_seconds: parse_or(
                non_empty("CACHE_TTL_SECONDS"),
                "CACHE_TTL_SECONDS",
                DEFAULT_CACHE_TTL_SECONDS,
            )?,
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
