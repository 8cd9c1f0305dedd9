//! Configuration for where the counter persists its state.
//!
//! ```toml
//! name = "countStore"
//!
//! [storage]
//! backend = "file"          # or "memory"
//! dir = "/var/lib/counter"  # optional
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::counter::STORAGE_KEY;
use crate::error::ConfigError;
use crate::storage::{validate_key, FileStorage, MemoryStorage, Storage};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage key of the persisted record.
    pub name: String,
    pub storage: StorageConfig,
}

/// Which storage medium to persist into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process-local, lost on exit.
    Memory,
    /// JSON files in `dir`, or in [`Config::default_data_dir`] when unset.
    File {
        #[serde(default)]
        dir: Option<PathBuf>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File { dir: None }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: STORAGE_KEY.to_string(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `dirs::config_dir()/counter-store/config.toml`, falling back to
    /// the current directory if no config dir is available.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("counter-store").join("config.toml")
    }

    /// Directory used by the file backend when no `dir` is configured.
    pub fn default_data_dir() -> PathBuf {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        data_dir.join("counter-store")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `Config::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that the record name is a valid storage key and a configured
    /// dir is non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "name must not be empty".to_string(),
            });
        }
        if let Err(e) = validate_key(&self.name) {
            return Err(ConfigError::Validation {
                message: format!("name is not a usable storage key: {e}"),
            });
        }
        if let StorageConfig::File { dir: Some(dir) } = &self.storage {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation {
                    message: "storage.dir must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build the configured storage medium.
    pub fn open_storage(&self) -> Arc<dyn Storage> {
        match &self.storage {
            StorageConfig::Memory => Arc::new(MemoryStorage::new()),
            StorageConfig::File { dir } => {
                let dir = dir.clone().unwrap_or_else(Self::default_data_dir);
                tracing::debug!(dir = %dir.display(), "using file storage");
                Arc::new(FileStorage::new(dir))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn default_uses_count_store_key_and_file_backend() {
        let config = Config::default();
        assert_eq!(config.name, "countStore");
        assert_eq!(config.storage, StorageConfig::File { dir: None });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_file_backend() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
name = "counter"

[storage]
backend = "file"
dir = "/tmp/counter"
"#,
        );

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.name, "counter");
        assert_eq!(
            config.storage,
            StorageConfig::File {
                dir: Some(PathBuf::from("/tmp/counter"))
            }
        );
    }

    #[test]
    fn parses_memory_backend_with_default_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[storage]\nbackend = \"memory\"\n");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.name, STORAGE_KEY);
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "name = ");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_empty_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "name = \"  \"\n");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_names_storage_cannot_hold() {
        for name in [".", "..", "a/b", "a\\b", "a\0b"] {
            let config = Config {
                name: name.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation { .. })),
                "name {name:?} should be rejected"
            );
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load_from(&temp_dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
