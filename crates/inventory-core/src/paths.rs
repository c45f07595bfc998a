use crate::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "example";
pub const APP_NAME: &str = "inventory";

/// Overrides the platform data directory when set.
pub const DATA_DIR_ENV: &str = "INVENTORY_DATA_DIR";

pub fn data_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(override_path) = std::env::var(DATA_DIR_ENV) {
        if !override_path.is_empty() {
            return Ok(PathBuf::from(override_path));
        }
    }
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME).ok_or(ConfigError::NoDataDir)?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn config_file() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME).ok_or(ConfigError::NoDataDir)?;
    Ok(dirs.config_dir().join("inventory.json"))
}

pub fn database_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(name)
}

pub fn keystore_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("keystore")
}

/// SQLite sidecar files that belong to a database file.
pub fn sidecar_paths(db_path: &Path) -> Vec<PathBuf> {
    ["-journal", "-wal", "-shm"]
        .iter()
        .map(|suffix| {
            let mut name = db_path.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect()
}
