//! Client configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use isperp_core::contact;
use isperp_observability::{LogFormat, ParseLogFormatError};

pub const ENV_API_URL: &str = "ISPERP_API_URL";
pub const ENV_SESSION_FILE: &str = "ISPERP_SESSION_FILE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "ISPERP_HTTP_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "ISPERP_LOG_FORMAT";

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got `{value}`")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got `{value}`")]
    InvalidTimeout { var: &'static str, value: String },

    #[error(transparent)]
    LogFormat(#[from] ParseLogFormatError),

    #[error("failed to resolve OS app data directory; set ISPERP_SESSION_FILE")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to, without a trailing slash.
    pub api_url: String,
    pub session_file: PathBuf,
    pub http_timeout: Duration,
    pub log_format: LogFormat,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = match get(ENV_API_URL) {
            Some(value) => normalize_api_url(ENV_API_URL, &value)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let session_file = match get(ENV_SESSION_FILE) {
            Some(path) => PathBuf::from(path.trim()),
            None => default_session_file()?,
        };

        let http_timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: ENV_HTTP_TIMEOUT_SECS,
                        value,
                    });
                }
            },
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let log_format = match get(ENV_LOG_FORMAT) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api_url,
            session_file,
            http_timeout,
            log_format,
        })
    }
}

fn normalize_api_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if contact::is_valid_url(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
        })
    }
}

/// `{app_data_dir}/isperp/session.json`.
///
/// The directory is not created here; the session store creates it on first
/// write.
pub fn default_session_file() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(ConfigError::NoDataDir)?;
    path.push("isperp");
    path.push("session.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn explicit_values_are_used() {
        let cfg = config_from(&[
            (ENV_API_URL, "https://erp.example.net/api/"),
            (ENV_SESSION_FILE, "/tmp/isperp/session.json"),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
            (ENV_LOG_FORMAT, "pretty"),
        ])
        .unwrap();

        assert_eq!(cfg.api_url, "https://erp.example.net/api");
        assert_eq!(cfg.session_file, PathBuf::from("/tmp/isperp/session.json"));
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config_from(&[
            (ENV_API_URL, "  "),
            (ENV_SESSION_FILE, "/tmp/s.json"),
        ])
        .unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.http_timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_values_are_rejected() {
        let base = (ENV_SESSION_FILE, "/tmp/s.json");
        assert!(matches!(
            config_from(&[base, (ENV_API_URL, "ftp://nope")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            config_from(&[base, (ENV_HTTP_TIMEOUT_SECS, "0")]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            config_from(&[base, (ENV_HTTP_TIMEOUT_SECS, "soon")]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            config_from(&[base, (ENV_LOG_FORMAT, "xml")]),
            Err(ConfigError::LogFormat(_))
        ));
    }
}
