//! services/admin/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the backend API, without a trailing slash.
    pub api_url: String,
    pub session_file: PathBuf,
    pub log_level: Level,
    pub request_timeout: Duration,
    /// How long a successful upload stays selected before it is cleared.
    pub upload_clear_delay: Duration,
    pub download_dir: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let api_url = lookup("ADMIN_API_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        let api_url = normalize_api_url(&api_url)?;

        let request_timeout = Duration::from_secs(parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 30)?);

        // --- Local State ---
        let session_file = lookup("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.payjobber-session.json"));

        let download_dir = lookup("DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        // --- Logging and UX ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let upload_clear_delay =
            Duration::from_millis(parse_number(&lookup, "UPLOAD_CLEAR_DELAY_MS", 1200)?);

        Ok(Self {
            api_url,
            session_file,
            log_level,
            request_timeout,
            upload_clear_delay,
            download_dir,
        })
    }

    /// Replaces the API base URL, e.g. from a command-line flag.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(api_url)?;
        Ok(self)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue(
            "ADMIN_API_URL".to_string(),
            format!("'{}' is not an http(s) URL", raw),
        ));
    }
    Ok(trimmed.to_string())
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.upload_clear_delay, Duration::from_millis(1200));
        assert_eq!(config.download_dir, PathBuf::from("."));
    }

    #[test]
    fn api_url_loses_trailing_slash() {
        let config = load(&[("ADMIN_API_URL", "https://api.example.test/v1/")]).unwrap();
        assert_eq!(config.api_url, "https://api.example.test/v1");
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = load(&[("RUST_LOG", "chatty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "RUST_LOG"));

        let err = load(&[("UPLOAD_CLEAR_DELAY_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "UPLOAD_CLEAR_DELAY_MS"));

        let err = load(&[("ADMIN_API_URL", "ftp://files")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "ADMIN_API_URL"));
    }

    #[test]
    fn api_url_can_be_overridden() {
        let config = load(&[]).unwrap().with_api_url("http://10.0.0.6:8000/").unwrap();
        assert_eq!(config.api_url, "http://10.0.0.6:8000");
    }
}
