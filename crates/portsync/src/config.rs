//! Runtime configuration read from the environment

use gluetun::GluetunAuth;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_GLUETUN_URL: &str = "http://localhost:8000/v1/portforward";
const DEFAULT_QBITTORRENT_URL: &str = "http://localhost:8080";
const DEFAULT_UPDATE_INTERVAL_MS: u64 = 300_000;
const DEFAULT_SERVER_PORT: u16 = 5000;
const DEFAULT_PUBLIC_DIR: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got \"{value}\"")]
    InvalidNumber { key: &'static str, value: String },
    #[error("UPDATE_INTERVAL must be greater than zero")]
    ZeroInterval,
}

/// Everything the service needs to run
#[derive(Debug, Clone)]
pub struct Config {
    pub gluetun_url: String,
    pub gluetun_auth: GluetunAuth,
    pub qbittorrent_url: String,
    pub qbittorrent_user: String,
    pub qbittorrent_pass: String,
    pub update_interval: Duration,
    pub server_port: u16,
    pub public_dir: PathBuf,
}

impl Config {
    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let interval_ms: u64 =
            parse_or(get("UPDATE_INTERVAL"), "UPDATE_INTERVAL", DEFAULT_UPDATE_INTERVAL_MS)?;
        if interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let gluetun_auth = GluetunAuth::from_settings(
            &get_or("GLUETUN_AUTH_METHOD", "none"),
            &get_or("GLUETUN_AUTH_USERNAME", ""),
            &get_or("GLUETUN_AUTH_PASSWORD", ""),
            &get_or("GLUETUN_AUTH_API_KEY", ""),
        );

        Ok(Config {
            gluetun_url: get_or("GLUETUN_SERVER_URL", DEFAULT_GLUETUN_URL),
            gluetun_auth,
            qbittorrent_url: get_or("QBITTORRENT_URL", DEFAULT_QBITTORRENT_URL),
            qbittorrent_user: get_or("QBITTORRENT_USER", ""),
            qbittorrent_pass: get_or("QBITTORRENT_PASS", ""),
            update_interval: Duration::from_millis(interval_ms),
            server_port: parse_or(get("SERVER_PORT"), "SERVER_PORT", DEFAULT_SERVER_PORT)?,
            public_dir: PathBuf::from(get_or("PUBLIC_DIR", DEFAULT_PUBLIC_DIR)),
        })
    }
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.clone(),
        }),
    }
}
