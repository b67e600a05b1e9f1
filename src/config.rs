// src/config.rs
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
#[error("invalid value for {key}: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub media_root: PathBuf,
    pub session_ttl_hours: i64,
    pub max_upload_bytes: usize,
    pub secure_cookies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3030,
            database_url: None,
            max_connections: 5,
            media_root: PathBuf::from("media"),
            session_ttl_hours: 24 * 14,
            max_upload_bytes: 5 * 1024 * 1024,
            secure_cookies: false,
        }
    }
}

impl Config {
    /// Reads the environment. `.env` is loaded by the caller beforehand.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, data will be kept in memory only");
        }

        Ok(Self {
            port: try_load("PORT", defaults.port)?,
            database_url,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            media_root: try_load("MEDIA_ROOT", defaults.media_root)?,
            session_ttl_hours: try_load("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            secure_cookies: try_load("SECURE_COOKIES", defaults.secure_cookies)?,
        })
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            reason: e.to_string(),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_key_falls_back_to_default() {
        let port: u16 = try_load("POLL_SITE_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn unparsable_value_is_an_error() {
        env::set_var("POLL_SITE_TEST_BAD_PORT", "not-a-port");
        let err = try_load::<u16>("POLL_SITE_TEST_BAD_PORT", 3030).unwrap_err();
        assert!(err.to_string().contains("POLL_SITE_TEST_BAD_PORT"));
    }
}
