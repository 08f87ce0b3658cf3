use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;
use crate::state::StateMessages;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("empty label for {0} state")]
    EmptyLabel(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub button: ButtonConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Everything the embedding application supplies to one button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Watchdog timeout in milliseconds. `0` (or absent) disables it.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub state_messages: StateMessages,
}

/// Local control API (`GET /api/state`, `POST /api/click`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_duration_ms: default_max_duration_ms(),
            is_disabled: false,
            state_messages: StateMessages::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_url() -> String {
    "https://httpbin.org/delay/3".to_string()
}

fn default_max_duration_ms() -> u64 {
    4000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

impl ButtonConfig {
    pub fn new(url: impl Into<String>, max_duration_ms: u64) -> Self {
        Self {
            url: url.into(),
            max_duration_ms,
            ..Self::default()
        }
    }

    /// The watchdog duration, or `None` when the watchdog is disabled.
    pub fn max_duration(&self) -> Option<Duration> {
        match self.max_duration_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Check the configuration and return the parsed request target.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        let messages = &self.state_messages;
        for (name, msg) in [
            ("default", &messages.default),
            ("loading", &messages.loading),
            ("error", &messages.error),
        ] {
            if msg.label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel(name));
            }
        }
        Ok(url)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.http.enabled);
        assert_eq!(config.http.port, 8990);
        assert_eq!(config.http.bind_address, "127.0.0.1");
        assert_eq!(config.button.url, "https://httpbin.org/delay/3");
        assert_eq!(config.button.max_duration(), Some(Duration::from_millis(4000)));
        assert_eq!(config.button.state_messages.loading.label, "Launching");
        assert!(config.button.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_disables_watchdog() {
        let button = ButtonConfig::new("http://localhost/", 0);
        assert_eq!(button.max_duration(), None);
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let err = ButtonConfig::new("not a url", 1000).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));

        let err = ButtonConfig::new("ftp://example.com/file", 1000)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme ftp"));
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let mut button = ButtonConfig::default();
        button.state_messages.error.label = "  ".to_string();
        let err = button.validate().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLabel("error")));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [button]
            url = "http://127.0.0.1:9000/slow"
            "#,
        )
        .unwrap();
        assert_eq!(config.button.url, "http://127.0.0.1:9000/slow");
        assert_eq!(config.button.max_duration_ms, 4000);
        assert!(!config.button.is_disabled);
        assert_eq!(config.button.state_messages, StateMessages::default());
    }

    #[test]
    fn test_load_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let mut edited = first.clone();
        edited.button.max_duration_ms = 0;
        edited.button.state_messages.default.label = "Fetch".to_string();
        edited.save_to(&path).unwrap();

        let second = Config::load_from(&path).unwrap();
        assert_eq!(second.button.max_duration(), None);
        assert_eq!(second.button.state_messages.default.label, "Fetch");
    }
}
