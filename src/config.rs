//! Configuration loading and management
//!
//! Handles parsing of `taskchat.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// File name of the configuration inside the data directory
pub const CONFIG_FILE: &str = "taskchat.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Session storage settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Chat transcript settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Intent classifier endpoint
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file, relative paths resolve against the data dir
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// How long a writer waits on a busy database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("taskchat.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding one JSON file per session
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,

    /// How long to wait for a session file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Keep only the last N transcript entries (0 keeps everything)
    #[serde(default)]
    pub history_limit: usize,

    /// First bot message after login
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Speaker label for bot messages
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// strftime format for transcript timestamps
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_welcome_message() -> String {
    "Welcome to the \"Task Manager\" what can i help you today?".to_string()
}

fn default_bot_name() -> String {
    "Bot".to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 0,
            welcome_message: default_welcome_message(),
            bot_name: default_bot_name(),
            time_format: default_time_format(),
        }
    }
}

impl ChatConfig {
    pub fn history_limit(&self) -> Option<usize> {
        (self.history_limit > 0).then_some(self.history_limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Endpoint receiving `{id, message}`; unset means intents must be given
    /// explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_classifier_timeout_ms() -> u64 {
    10_000
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a `taskchat.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `taskchat.toml` from the data dir, or defaults when it is absent
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("store.path cannot be empty".to_string()));
        }
        if self.store.busy_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.busy_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.session.dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("session.dir cannot be empty".to_string()));
        }
        if self.chat.bot_name.trim().is_empty() {
            return Err(Error::InvalidConfig("chat.bot_name cannot be empty".to_string()));
        }
        if self.chat.time_format.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "chat.time_format cannot be empty".to_string(),
            ));
        }
        if let Some(url) = &self.classifier.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "classifier.url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        if self.classifier.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "classifier.timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Database path with relative paths resolved against `data_dir`
    pub fn store_path(&self, data_dir: &Path) -> PathBuf {
        resolve_in(data_dir, &self.store.path)
    }

    /// Session directory with relative paths resolved against `data_dir`
    pub fn session_dir(&self, data_dir: &Path) -> PathBuf {
        resolve_in(data_dir, &self.session.dir)
    }
}

fn resolve_in(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.store.path, PathBuf::from("taskchat.db"));
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.session.dir, PathBuf::from("sessions"));
        assert_eq!(config.chat.bot_name, "Bot");
        assert_eq!(config.chat.history_limit(), None);
        assert!(config.classifier.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chat]
            history_limit = 20

            [classifier]
            url = "http://localhost:5000/chat"
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.history_limit(), Some(20));
        assert_eq!(config.chat.time_format, "%H:%M");
        assert_eq!(config.classifier.timeout_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn relative_paths_resolve_against_data_dir() {
        let config = Config::default();
        let dir = Path::new("/var/lib/taskchat");
        assert_eq!(
            config.store_path(dir),
            PathBuf::from("/var/lib/taskchat/taskchat.db")
        );
        assert_eq!(
            config.session_dir(dir),
            PathBuf::from("/var/lib/taskchat/sessions")
        );
    }

    #[test]
    fn rejects_zero_busy_timeout() {
        let mut config = Config::default();
        config.store.busy_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_http_classifier_url() {
        let mut config = Config::default();
        config.classifier.url = Some("ftp://example.com".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
