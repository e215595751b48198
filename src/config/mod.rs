//! Configuration module for the RSVP server and sync client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::sync::SyncOptions;

/// Application name used for the cache directory
const APP_NAME: &str = "rsvp";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("RSVP_DB_PATH")
            .unwrap_or_else(|_| "./data/rsvp.sqlite".to_string())
            .into();

        let bind_addr = env::var("RSVP_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid RSVP_BIND_ADDR format");

        let log_level = env::var("RSVP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = env::var("RSVP_LOG_FORMAT")
            .map(|s| LogFormat::parse(&s))
            .unwrap_or(LogFormat::Pretty);

        Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
        }
    }
}

/// Sync client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the RSVP server
    pub server_url: String,
    /// Directory holding the local cache files
    pub cache_dir: PathBuf,
    /// Timeout applied to every remote call
    pub request_timeout: Duration,
    /// Retry, duplicate-check and refresh policy
    pub sync: SyncOptions,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let server_url = env::var("RSVP_SERVER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let cache_dir = env::var("RSVP_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_cache_dir());

        let defaults = SyncOptions::default();
        let sync = SyncOptions {
            max_attempts: env_parse("RSVP_SYNC_ATTEMPTS").unwrap_or(defaults.max_attempts),
            retry_delay: env_parse("RSVP_SYNC_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            check_duplicates: env_parse("RSVP_DUPLICATE_CHECK")
                .unwrap_or(defaults.check_duplicates),
            refresh_interval: env_parse("RSVP_REFRESH_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
        };

        let request_timeout = env_parse("RSVP_REQUEST_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Self {
            server_url,
            cache_dir,
            request_timeout,
            sync,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Server and client defaults share process env, so they are checked in one test.
    #[test]
    fn test_default_config() {
        env::remove_var("RSVP_DB_PATH");
        env::remove_var("RSVP_BIND_ADDR");
        env::remove_var("RSVP_LOG_LEVEL");
        env::remove_var("RSVP_LOG_FORMAT");
        env::remove_var("RSVP_SERVER_URL");
        env::remove_var("RSVP_CACHE_DIR");
        env::remove_var("RSVP_SYNC_ATTEMPTS");
        env::remove_var("RSVP_SYNC_RETRY_DELAY_MS");
        env::remove_var("RSVP_DUPLICATE_CHECK");
        env::remove_var("RSVP_REFRESH_SECS");
        env::remove_var("RSVP_REQUEST_TIMEOUT_SECS");

        let config = Config::from_env();
        assert_eq!(config.db_path, PathBuf::from("./data/rsvp.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);

        let client = ClientConfig::from_env();
        assert_eq!(client.server_url, "http://127.0.0.1:8080");
        assert!(client.cache_dir.ends_with(APP_NAME));
        assert_eq!(client.request_timeout, Duration::from_secs(10));
        assert_eq!(client.sync.max_attempts, 3);
        assert_eq!(client.sync.retry_delay, Duration::from_secs(1));
        assert!(client.sync.check_duplicates);
        assert_eq!(client.sync.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }
}
