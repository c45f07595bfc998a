//! One-shot construction of the shared database handle
//!
//! The first caller resolves the cipher key (generating a key pair if the
//! alias is empty), opens the encrypted file and publishes the handle. Every
//! later caller gets the same `Arc` without touching the keystore or the file.

use crate::cipher::CipherKey;
use crate::config::InventoryConfig;
use crate::database::InventoryDatabase;
use crate::error::{BootstrapError, Result};
use crate::keystore::{lookup_cipher_key, KeyGenSpec, KeyLookup, KeyStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

pub struct DatabaseBootstrapper {
    keystore: Arc<dyn KeyStore>,
    config: InventoryConfig,
    handle: OnceLock<Arc<InventoryDatabase>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl DatabaseBootstrapper {
    pub fn new(config: InventoryConfig, keystore: Arc<dyn KeyStore>) -> Self {
        Self {
            keystore,
            config,
            handle: OnceLock::new(),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn keystore(&self) -> &Arc<dyn KeyStore> {
        &self.keystore
    }

    /// Return the shared database, building it on first use.
    ///
    /// Safe to call from any number of threads. At most one build runs at a
    /// time and a successful build is never repeated. A failed build leaves
    /// nothing published, so a later call starts over.
    pub fn get_database(&self) -> Result<Arc<InventoryDatabase>> {
        if let Some(db) = self.handle.get() {
            return Ok(Arc::clone(db));
        }

        let _guard = self.build_lock.lock();
        if let Some(db) = self.handle.get() {
            return Ok(Arc::clone(db));
        }

        let db = Arc::new(self.build()?);
        // Only set while holding build_lock, so the cell is still empty.
        let _ = self.handle.set(Arc::clone(&db));
        Ok(db)
    }

    /// The published handle, if a build has succeeded.
    pub fn get_if_initialized(&self) -> Option<Arc<InventoryDatabase>> {
        self.handle.get().cloned()
    }

    /// Number of build sequences started, successful or not.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub(crate) fn into_handle(self) -> Option<Arc<InventoryDatabase>> {
        self.handle.into_inner()
    }

    fn build(&self) -> Result<InventoryDatabase> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.config.validate()?;
        let alias = self.config.keystore.alias.as_str();
        let path = self.config.database_path()?;
        debug!(backend = self.keystore.name(), alias, path = %path.display(), "building database");

        let key = self.resolve_cipher_key()?;
        let db = InventoryDatabase::open(&path, &key, &self.config.database)?;
        Ok(db)
    }

    fn resolve_cipher_key(&self) -> Result<CipherKey> {
        let alias = self.config.keystore.alias.as_str();
        self.keystore
            .load()
            .map_err(BootstrapError::KeystoreUnavailable)?;

        match lookup_cipher_key(self.keystore.as_ref(), alias) {
            KeyLookup::Found(key) => {
                debug!(alias, key = %key.fingerprint(), "using existing cipher key");
                Ok(key)
            }
            KeyLookup::NotFound => self.create_cipher_key(),
            KeyLookup::WrongType(kind) => {
                warn!(alias, ?kind, "keystore entry is not a private key; replacing it");
                self.create_cipher_key()
            }
            KeyLookup::Corrupt(source) => {
                // Regenerating would orphan the existing database.
                error!(alias, error = %source, "stored database key is corrupt");
                Err(BootstrapError::CorruptKey {
                    alias: alias.to_string(),
                    source,
                })
            }
            KeyLookup::Failed(err) => Err(BootstrapError::KeystoreUnavailable(err)),
        }
    }

    fn create_cipher_key(&self) -> Result<CipherKey> {
        let alias = self.config.keystore.alias.as_str();
        let info = self
            .keystore
            .generate_key_pair(&KeyGenSpec::signing(alias))
            .map_err(|e| BootstrapError::KeyCreationFailure {
                alias: alias.to_string(),
                reason: e.to_string(),
            })?;
        info!(
            alias,
            backend = self.keystore.name(),
            public_key = %hex::encode(info.public_key.to_bytes()),
            "generated database key pair"
        );

        match lookup_cipher_key(self.keystore.as_ref(), alias) {
            KeyLookup::Found(key) => Ok(key),
            KeyLookup::NotFound => Err(BootstrapError::MissingCipherKey {
                alias: alias.to_string(),
            }),
            KeyLookup::WrongType(kind) => Err(BootstrapError::KeyCreationFailure {
                alias: alias.to_string(),
                reason: format!("entry is a {kind:?} after generation"),
            }),
            KeyLookup::Corrupt(source) => Err(BootstrapError::KeyCreationFailure {
                alias: alias.to_string(),
                reason: format!("generated key cannot be read back: {source}"),
            }),
            KeyLookup::Failed(err) => Err(BootstrapError::KeystoreUnavailable(err)),
        }
    }
}

impl std::fmt::Debug for DatabaseBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseBootstrapper")
            .field("keystore", &self.keystore.name())
            .field("alias", &self.config.keystore.alias)
            .field("initialized", &self.handle.get().is_some())
            .field("builds", &self.build_count())
            .finish()
    }
}
