//! In-process keystore
//!
//! Entries live in memory only. Used when the configured backend is `memory`
//! and as the default store in tests.

use super::{
    validate_alias, KeyEntry, KeyGenSpec, KeyPairInfo, KeyStore, PrivateKeyEntry, SecretEntry,
};
use crate::error::KeystoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, KeyEntry>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store opaque secret material under `alias`, replacing any entry.
    pub fn insert_secret(&self, alias: &str, material: &[u8]) -> Result<(), KeystoreError> {
        let entry = SecretEntry::new(alias, material)?;
        self.entries
            .write()
            .insert(alias.to_string(), KeyEntry::Secret(entry));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.read().contains_key(alias)
    }
}

impl KeyStore for MemoryKeyStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> Result<(), KeystoreError> {
        Ok(())
    }

    fn get_entry(&self, alias: &str) -> Result<Option<KeyEntry>, KeystoreError> {
        validate_alias(alias)?;
        Ok(self.entries.read().get(alias).cloned())
    }

    fn generate_key_pair(&self, spec: &KeyGenSpec) -> Result<KeyPairInfo, KeystoreError> {
        let entry = PrivateKeyEntry::generate(spec)?;
        let public_key = entry.verifying_key();
        self.entries
            .write()
            .insert(spec.alias.clone(), KeyEntry::PrivateKey(entry));
        Ok(KeyPairInfo {
            alias: spec.alias.clone(),
            public_key,
        })
    }
}
