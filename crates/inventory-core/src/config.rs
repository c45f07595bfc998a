//! Runtime configuration
//!
//! Every field has a default so an empty `{}` file, or no file at all, yields a
//! working setup: OS keyring, `item_key` alias, `item_database` at schema 3 in
//! the platform data directory.

use crate::error::ConfigError;
use crate::keystore::validate_alias;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_KEY_ALIAS: &str = "item_key";
pub const DEFAULT_DATABASE_NAME: &str = "item_database";
pub const DEFAULT_SCHEMA_VERSION: i64 = 3;
pub const DEFAULT_KEYRING_SERVICE: &str = "inventory-vault";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    pub fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreBackend {
    /// OS credential store (Keychain, Credential Manager, Secret Service).
    #[default]
    Keyring,
    /// Owner-only files under `<data_dir>/keystore`.
    File,
    /// Process memory; keys are lost on exit.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_name")]
    pub name: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: i64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_database_name(),
            schema_version: default_schema_version(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreConfig {
    #[serde(default)]
    pub backend: KeystoreBackend,
    #[serde(default = "default_alias")]
    pub alias: String,
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            backend: KeystoreBackend::default(),
            alias: default_alias(),
            service: default_service(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub keystore: KeystoreConfig,
}

impl InventoryConfig {
    /// Config rooted at an explicit data directory, defaults elsewhere.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// Load from `path`, or from the platform config file when `None`.
    /// A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (paths::config_file()?, false),
        };
        if !path.exists() {
            if required {
                return Err(ConfigError::Io {
                    path,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "config not found"),
                });
            }
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let data = std::fs::read(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_slice(&data).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.name.trim().is_empty() {
            return Err(ConfigError::Invalid("database.name must not be empty".into()));
        }
        if self.database.name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(
                "database.name must be a file name, not a path".into(),
            ));
        }
        if self.database.schema_version < 1 {
            return Err(ConfigError::Invalid(
                "database.schema_version must be at least 1".into(),
            ));
        }
        validate_alias(&self.keystore.alias).map_err(|_| {
            ConfigError::Invalid(format!(
                "keystore.alias '{}' must be 1-128 characters of [A-Za-z0-9_.-] not starting with '.'",
                self.keystore.alias
            ))
        })?;
        Ok(())
    }

    /// Explicit `data_dir` wins over `INVENTORY_DATA_DIR`, which wins over the
    /// platform default.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::data_dir(),
        }
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::database_path(
            &self.resolved_data_dir()?,
            &self.database.name,
        ))
    }
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

fn default_schema_version() -> i64 {
    DEFAULT_SCHEMA_VERSION
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_alias() -> String {
    DEFAULT_KEY_ALIAS.to_string()
}

fn default_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "{}").unwrap();
        let config = InventoryConfig::load(Some(&path)).unwrap();
        assert_eq!(config.database.name, "item_database");
        assert_eq!(config.database.schema_version, 3);
        assert_eq!(config.keystore.alias, "item_key");
        assert_eq!(config.keystore.backend, KeystoreBackend::Keyring);
        assert_eq!(config.database.journal_mode, JournalMode::Wal);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/srv/inventory", "keystore": {"backend": "file"}, "database": {"schema_version": 4}}"#,
        )
        .unwrap();
        let config = InventoryConfig::load(Some(&path)).unwrap();
        assert_eq!(config.keystore.backend, KeystoreBackend::File);
        assert_eq!(config.keystore.alias, "item_key");
        assert_eq!(config.database.schema_version, 4);
        assert_eq!(
            config.resolved_data_dir().unwrap(),
            PathBuf::from("/srv/inventory")
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = InventoryConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn rejects_path_like_database_name() {
        let mut config = InventoryConfig::default();
        config.database.name = "../escape".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unusable_alias() {
        for alias in ["", "bad alias", "../item_key", ".hidden"] {
            let mut config = InventoryConfig::default();
            config.keystore.alias = alias.into();
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "alias {alias:?} should be rejected"
            );
        }
    }

    #[test]
    fn alias_checked_when_loading() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, r#"{"keystore": {"alias": "bad alias"}}"#).unwrap();
        assert!(matches!(
            InventoryConfig::load(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_zero_schema_version() {
        let mut config = InventoryConfig::default();
        config.database.schema_version = 0;
        assert!(config.validate().is_err());
    }
}
