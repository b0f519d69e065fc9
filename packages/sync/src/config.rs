use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "nodedoc.config.json";

/// Overrides `baseUrl` when set
pub const BASE_URL_ENV: &str = "NODEDOC_BASE_URL";

/// Sync endpoint configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Server origin, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    #[serde(default = "default_subscribe_path")]
    pub subscribe_path: String,

    #[serde(default = "default_unsubscribe_path")]
    pub unsubscribe_path: String,

    /// Query parameter carrying the credential on the stream request
    #[serde(default = "default_token_param")]
    pub token_param: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Channels subscribed when a session starts
    #[serde(default)]
    pub channels: Vec<String>,

    /// Retained revisions per document (0 = unlimited)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_base_url() -> String {
    "http://127.0.0.1:3030".to_string()
}

fn default_stream_path() -> String {
    "/api/stream".to_string()
}

fn default_subscribe_path() -> String {
    "/api/subscribe".to_string()
}

fn default_unsubscribe_path() -> String {
    "/api/unsubscribe".to_string()
}

fn default_token_param() -> String {
    "token".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    50
}

impl SyncConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            SyncConfig::default()
        };

        config.apply_env_overrides();
        config.check()?;
        Ok(config)
    }

    /// Read an explicit config file; no environment overrides applied
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url.trim().to_string();
            }
        }
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "baseUrl",
                message: format!("expected an http(s) URL, got `{}`", self.base_url),
            });
        }

        if self.token_param.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "tokenParam",
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Join `path` onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn stream_url(&self) -> String {
        self.endpoint(&self.stream_path)
    }

    pub fn subscribe_url(&self) -> String {
        self.endpoint(&self.subscribe_path)
    }

    pub fn unsubscribe_url(&self) -> String {
        self.endpoint(&self.unsubscribe_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn config_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(DEFAULT_CONFIG_NAME)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            subscribe_path: default_subscribe_path(),
            unsubscribe_path: default_unsubscribe_path(),
            token_param: default_token_param(),
            request_timeout_secs: default_request_timeout_secs(),
            channels: vec![],
            history_limit: default_history_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "baseUrl": "https://sync.example.org",
            "streamPath": "/events",
            "channels": ["thread-1", "thread-2"],
            "historyLimit": 5
        }"#;

        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url, "https://sync.example.org");
        assert_eq!(config.stream_path, "/events");
        assert_eq!(config.subscribe_path, "/api/subscribe");
        assert_eq!(config.channels, vec!["thread-1", "thread-2"]);
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.token_param, "token");
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.stream_url(), "http://127.0.0.1:3030/api/stream");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.channels.is_empty());
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let config = SyncConfig {
            base_url: "http://host:1/".to_string(),
            ..SyncConfig::default()
        };
        assert_eq!(config.endpoint("/api/subscribe"), "http://host:1/api/subscribe");
        assert_eq!(config.endpoint("api/subscribe"), "http://host:1/api/subscribe");
    }

    #[test]
    fn test_check_rejects_bad_values() {
        let config = SyncConfig {
            base_url: "ftp://nope".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(
            config.check(),
            Err(ConfigError::Invalid { field: "baseUrl", .. })
        ));

        let config = SyncConfig {
            token_param: " ".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        let error = SyncConfig::from_file(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains(DEFAULT_CONFIG_NAME));
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = SyncConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }
}
