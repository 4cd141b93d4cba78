//! Client configuration.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a gupsik client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the meal backend (`http://` or `https://`)
    pub server_url: String,

    /// Directory of the persisted client-local store
    pub data_dir: PathBuf,

    /// First reconnect delay, also the value restored after a successful open
    pub reconnect_floor: Duration,

    /// Largest reconnect delay
    pub reconnect_ceiling: Duration,

    /// Period of the likes reorder while a date is shown
    pub like_reorder_interval: Duration,

    /// Likes one client may send per school per date
    pub like_cap: u32,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("./gupsik-data"),
            reconnect_floor: Duration::from_millis(5_000),
            reconnect_ceiling: Duration::from_millis(60_000),
            like_reorder_interval: Duration::from_secs(30),
            like_cap: 5,
            request_timeout: Duration::from_millis(10_000),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_url = lookup("GUPSIK_SERVER_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.server_url);
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "GUPSIK_SERVER_URL must start with http:// or https://, got {server_url:?}"
            )));
        }

        let data_dir = lookup("GUPSIK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let reconnect_floor = parse_or(&lookup, "GUPSIK_RECONNECT_FLOOR_MS", None)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_floor);
        let reconnect_ceiling = parse_or(&lookup, "GUPSIK_RECONNECT_CEILING_MS", None)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_ceiling);
        if reconnect_floor.is_zero() || reconnect_ceiling < reconnect_floor {
            return Err(Error::Config(format!(
                "reconnect floor {reconnect_floor:?} must be non-zero and not above ceiling {reconnect_ceiling:?}"
            )));
        }

        let like_reorder_interval = parse_or(&lookup, "GUPSIK_LIKE_REORDER_SECS", None)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.like_reorder_interval);
        if like_reorder_interval.is_zero() {
            return Err(Error::Config("GUPSIK_LIKE_REORDER_SECS must be positive".into()));
        }

        let like_cap = parse_or(&lookup, "GUPSIK_LIKE_CAP", Some(defaults.like_cap))?
            .unwrap_or(defaults.like_cap);

        let request_timeout = parse_or(&lookup, "GUPSIK_REQUEST_TIMEOUT_MS", None)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        Ok(Self {
            server_url,
            data_dir,
            reconnect_floor,
            reconnect_ceiling,
            like_reorder_interval,
            like_cap,
            request_timeout,
        })
    }

    /// Point the config at another backend.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another local store directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// WebSocket endpoint for the given client token.
    pub fn ws_url(&self, client_id: &str) -> String {
        let base = if let Some(rest) = self.server_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.server_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.server_url.clone()
        };
        format!("{base}/ws?client_id={client_id}")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: Option<T>) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid {key} value {raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.reconnect_floor, Duration::from_millis(5_000));
        assert_eq!(config.reconnect_ceiling, Duration::from_millis(60_000));
        assert_eq!(config.like_reorder_interval, Duration::from_secs(30));
        assert_eq!(config.like_cap, 5);
    }

    #[test]
    fn overrides_from_env() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("GUPSIK_SERVER_URL", "https://meals.example/"),
            ("GUPSIK_LIKE_CAP", "3"),
            ("GUPSIK_RECONNECT_FLOOR_MS", "100"),
        ]))
        .unwrap();
        assert_eq!(config.server_url, "https://meals.example");
        assert_eq!(config.like_cap, 3);
        assert_eq!(config.reconnect_floor, Duration::from_millis(100));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("GUPSIK_LIKE_CAP", "many")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("GUPSIK_SERVER_URL", "ftp://x")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[
            ("GUPSIK_RECONNECT_FLOOR_MS", "9000"),
            ("GUPSIK_RECONNECT_CEILING_MS", "1000"),
        ]))
        .is_err());
    }

    #[test]
    fn ws_url_follows_scheme() {
        let plain = ClientConfig::default().with_server_url("http://localhost:8080");
        assert_eq!(plain.ws_url("abc"), "ws://localhost:8080/ws?client_id=abc");

        let tls = ClientConfig::default().with_server_url("https://meals.example");
        assert_eq!(tls.ws_url("abc"), "wss://meals.example/ws?client_id=abc");
    }
}
