//! File-backed keystore
//!
//! One JSON record per alias at `<dir>/<alias>.key`. Writes go through a temp
//! file in the same directory and are renamed into place. On Unix the
//! directory is `0700` and key files are `0600`.

use super::record::StoredKeyRecord;
use super::{validate_alias, KeyEntry, KeyGenSpec, KeyPairInfo, KeyStore, PrivateKeyEntry};
use crate::error::KeystoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const KEY_FILE_EXT: &str = "key";

pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("{alias}.{KEY_FILE_EXT}"))
    }

    fn write_record(&self, path: &Path, record: &StoredKeyRecord) -> Result<(), KeystoreError> {
        let json = record.to_json()?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        #[cfg(unix)]
        set_mode(tmp.path(), 0o600)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| KeystoreError::Io(e.error))?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> Result<(), KeystoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            KeystoreError::Unavailable(format!("create {}: {e}", self.dir.display()))
        })?;
        if !self.dir.is_dir() {
            return Err(KeystoreError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        #[cfg(unix)]
        set_mode(&self.dir, 0o700)
            .map_err(|e| KeystoreError::Unavailable(format!("restrict {}: {e}", self.dir.display())))?;
        Ok(())
    }

    fn get_entry(&self, alias: &str) -> Result<Option<KeyEntry>, KeystoreError> {
        validate_alias(alias)?;
        let path = self.key_path(alias);
        let data = match fs::read(&path) {
            Ok(data) => zeroize::Zeroizing::new(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry = StoredKeyRecord::from_json(&data)?.into_entry(alias)?;
        Ok(Some(entry))
    }

    fn generate_key_pair(&self, spec: &KeyGenSpec) -> Result<KeyPairInfo, KeystoreError> {
        let entry = PrivateKeyEntry::generate(spec)?;
        let public_key = entry.verifying_key();
        let path = self.key_path(&spec.alias);
        let record = StoredKeyRecord::from_entry(&KeyEntry::PrivateKey(entry))?;
        self.write_record(&path, &record)?;
        debug!(alias = %spec.alias, path = %path.display(), "wrote key file");
        Ok(KeyPairInfo {
            alias: spec.alias.clone(),
            public_key,
        })
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("keystore");

        let store1 = FileKeyStore::new(&dir);
        store1.load().unwrap();
        let info = store1
            .generate_key_pair(&KeyGenSpec::signing("item_key"))
            .unwrap();

        let store2 = FileKeyStore::new(&dir);
        store2.load().unwrap();
        let Some(KeyEntry::PrivateKey(entry)) = store2.get_entry("item_key").unwrap() else {
            panic!("expected a private key entry");
        };
        assert_eq!(entry.verifying_key(), info.public_key);
    }

    #[test]
    fn missing_key_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(temp_dir.path());
        store.load().unwrap();
        assert!(store.get_entry("item_key").unwrap().is_none());
    }

    #[test]
    fn corrupt_key_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(temp_dir.path());
        store.load().unwrap();
        fs::write(temp_dir.path().join("item_key.key"), b"not json").unwrap();
        assert!(store.get_entry("item_key").is_err());
    }

    #[test]
    fn load_fails_when_dir_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("keystore");
        fs::write(&blocker, b"").unwrap();
        let store = FileKeyStore::new(&blocker);
        assert!(matches!(store.load(), Err(KeystoreError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyStore::new(temp_dir.path().join("keystore"));
        store.load().unwrap();
        store
            .generate_key_pair(&KeyGenSpec::signing("item_key"))
            .unwrap();
        let mode = fs::metadata(store.dir().join("item_key.key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
