//! OS credential store backend
//!
//! Each alias is one keyring entry: service = configured service name,
//! user = alias, secret = the JSON key record.

use super::record::StoredKeyRecord;
use super::{validate_alias, KeyEntry, KeyGenSpec, KeyPairInfo, KeyStore, PrivateKeyEntry};
use crate::error::KeystoreError;
use ::keyring::Entry;
use tracing::debug;

/// Probed by `load()`; never written.
const PROBE_USER: &str = "__availability_probe__";

pub struct KeyringKeyStore {
    service: String,
}

impl KeyringKeyStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, user: &str) -> Result<Entry, KeystoreError> {
        Entry::new(&self.service, user).map_err(|e| map_keyring_error("keyring init", e))
    }
}

impl KeyStore for KeyringKeyStore {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn load(&self) -> Result<(), KeystoreError> {
        let probe = self.entry(PROBE_USER)?;
        match probe.get_password() {
            Ok(_) | Err(::keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeystoreError::Unavailable(format!("keyring probe: {e}"))),
        }
    }

    fn get_entry(&self, alias: &str) -> Result<Option<KeyEntry>, KeystoreError> {
        validate_alias(alias)?;
        let entry = self.entry(alias)?;
        let secret = match entry.get_password() {
            Ok(secret) => zeroize::Zeroizing::new(secret),
            Err(::keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(map_keyring_error("load key", e)),
        };
        let record = StoredKeyRecord::from_json(secret.as_bytes())?;
        Ok(Some(record.into_entry(alias)?))
    }

    fn generate_key_pair(&self, spec: &KeyGenSpec) -> Result<KeyPairInfo, KeystoreError> {
        let entry = PrivateKeyEntry::generate(spec)?;
        let public_key = entry.verifying_key();
        let json = StoredKeyRecord::from_entry(&KeyEntry::PrivateKey(entry))?.to_json()?;
        self.entry(&spec.alias)?
            .set_password(&json)
            .map_err(|e| map_keyring_error("store key", e))?;
        debug!(alias = %spec.alias, service = %self.service, "stored key in keyring");
        Ok(KeyPairInfo {
            alias: spec.alias.clone(),
            public_key,
        })
    }
}

fn map_keyring_error(context: &str, err: ::keyring::Error) -> KeystoreError {
    match err {
        ::keyring::Error::NoStorageAccess(e) => {
            KeystoreError::Unavailable(format!("{context}: no storage access: {e}"))
        }
        ::keyring::Error::PlatformFailure(e) => {
            KeystoreError::Unavailable(format!("{context}: platform failure: {e}"))
        }
        other => KeystoreError::Backend(format!("{context}: {other}")),
    }
}
