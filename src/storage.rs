//! Data directory layout for taskchat
//!
//! ```text
//! <data dir>/
//!   taskchat.toml            # Configuration
//!   taskchat.db              # SQLite store (store.path)
//!   sessions/                # session.dir
//!     <session>.json         # Session values, replaced atomically
//!     <session>.json.lock    # Exclusive lock sidecar
//! ```
//!
//! The data dir is `--data-dir`, then `TASKCHAT_DATA_DIR`, then the platform
//! data directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::lock;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKCHAT_DATA_DIR";

/// Platform data directory for taskchat
pub fn default_data_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("org", "taskchat", "taskchat")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "no home directory found; pass --data-dir or set {DATA_DIR_ENV}"
            ))
        })
}

/// Paths and file helpers rooted at one data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn store_path(&self, config: &Config) -> PathBuf {
        config.store_path(&self.data_dir)
    }

    pub fn session_dir(&self, config: &Config) -> PathBuf {
        config.session_dir(&self.data_dir)
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load_from_dir(&self.data_dir)
    }

    /// Create the directory tree and a default config when none exists.
    /// Returns whether a config file was written.
    pub fn init(&self, config: &Config) -> Result<bool> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.session_dir(config))?;
        let config_file = self.config_file();
        if config_file.exists() {
            return Ok(false);
        }
        config.save(&config_file)?;
        tracing::info!(path = %config_file.display(), "wrote default config");
        Ok(true)
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write pretty JSON, replacing the file atomically
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// `None` when the file does not exist
    pub fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths() {
        let storage = Storage::new("/data");
        let config = Config::default();
        assert_eq!(storage.config_file(), PathBuf::from("/data/taskchat.toml"));
        assert_eq!(storage.store_path(&config), PathBuf::from("/data/taskchat.db"));
        assert_eq!(storage.session_dir(&config), PathBuf::from("/data/sessions"));
    }

    #[test]
    fn init_writes_config_once() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().join("data"));
        let config = Config::default();

        assert!(!storage.config_file().exists());
        assert!(storage.init(&config).unwrap());
        assert!(storage.config_file().exists());
        assert!(storage.session_dir(&config).is_dir());
        assert!(!storage.init(&config).unwrap());
        assert_eq!(storage.load_config().unwrap(), config);
    }

    #[test]
    fn json_round_trip_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path());
        let path = temp.path().join("value.json");

        assert!(storage
            .read_json_opt::<serde_json::Value>(&path)
            .unwrap()
            .is_none());
        storage
            .write_json(&path, &serde_json::json!({"user": 3}))
            .unwrap();
        let value: serde_json::Value = storage.read_json(&path).unwrap();
        assert_eq!(value["user"], 3);
    }
}
