//! Configuration module for the todo server.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_READ_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_WRITE_RETRY_DELAY_MS: u64 = 500;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the backing JSON document
    pub file_path: PathBuf,
    /// Directory containing the widget HTML/JS/CSS bundles
    pub assets_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of the human-readable format
    pub log_json: bool,
    /// Attempt budget for file reads and writes
    pub max_retries: u32,
    /// Base backoff before retrying a failed read
    pub read_retry_delay: Duration,
    /// Base backoff before retrying a failed write
    pub write_retry_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let file_path = env::var("TODO_FILE_PATH")
            .unwrap_or_else(|_| "./todos.json".to_string())
            .into();

        let assets_dir = env::var("TODO_ASSETS_DIR")
            .unwrap_or_else(|_| "./assets".to_string())
            .into();

        let bind_addr = env::var("TODO_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .expect("Invalid TODO_BIND_ADDR format");

        let log_level = env::var("TODO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("TODO_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let max_retries = parse_retries("TODO_MAX_RETRIES");
        let read_retry_delay = Duration::from_millis(parse_or(
            "TODO_READ_RETRY_DELAY_MS",
            DEFAULT_READ_RETRY_DELAY_MS,
        ));
        let write_retry_delay = Duration::from_millis(parse_or(
            "TODO_WRITE_RETRY_DELAY_MS",
            DEFAULT_WRITE_RETRY_DELAY_MS,
        ));

        Self {
            file_path,
            assets_dir,
            bind_addr,
            log_level,
            log_json,
            max_retries,
            read_retry_delay,
            write_retry_delay,
        }
    }
}

/// Parse a numeric variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

/// At least one attempt is always made.
fn parse_retries(key: &str) -> u32 {
    parse_or(key, DEFAULT_MAX_RETRIES).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("TODO_FILE_PATH");
        env::remove_var("TODO_ASSETS_DIR");
        env::remove_var("TODO_BIND_ADDR");
        env::remove_var("TODO_LOG_LEVEL");
        env::remove_var("TODO_LOG_FORMAT");
        env::remove_var("TODO_MAX_RETRIES");
        env::remove_var("TODO_READ_RETRY_DELAY_MS");
        env::remove_var("TODO_WRITE_RETRY_DELAY_MS");

        let config = Config::from_env();

        assert_eq!(config.file_path, PathBuf::from("./todos.json"));
        assert_eq!(config.assets_dir, PathBuf::from("./assets"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.read_retry_delay, Duration::from_millis(1000));
        assert_eq!(config.write_retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_malformed_number_falls_back() {
        assert_eq!(parse_or("TODO_TEST_UNSET_NUMBER", 7u32), 7);

        env::set_var("TODO_TEST_MALFORMED_NUMBER", "abc");
        assert_eq!(parse_or("TODO_TEST_MALFORMED_NUMBER", 7u32), 7);
        env::set_var("TODO_TEST_MALFORMED_NUMBER", "-5");
        assert_eq!(parse_or("TODO_TEST_MALFORMED_NUMBER", 7u32), 7);
        env::set_var("TODO_TEST_MALFORMED_NUMBER", " 12 ");
        assert_eq!(parse_or("TODO_TEST_MALFORMED_NUMBER", 7u32), 12);
        env::remove_var("TODO_TEST_MALFORMED_NUMBER");
    }

    #[test]
    fn test_zero_retries_is_clamped() {
        env::set_var("TODO_TEST_ZERO_RETRIES", "0");
        assert_eq!(parse_retries("TODO_TEST_ZERO_RETRIES"), 1);
        env::set_var("TODO_TEST_ZERO_RETRIES", "oops");
        assert_eq!(parse_retries("TODO_TEST_ZERO_RETRIES"), DEFAULT_MAX_RETRIES);
        env::remove_var("TODO_TEST_ZERO_RETRIES");
    }
}
