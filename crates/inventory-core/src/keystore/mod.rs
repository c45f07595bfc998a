//! Secure key storage for the database cipher key
//!
//! A keystore holds signing key pairs addressed by alias. The bootstrapper only
//! ever needs one of them: the pair under the configured alias, whose PKCS#8
//! encoding seeds the database cipher key.
//!
//! - `KeyringKeyStore`: OS credential store (Keychain, Credential Manager,
//!   Secret Service)
//! - `FileKeyStore`: owner-only files, for headless hosts without a keyring
//! - `MemoryKeyStore`: process memory, for ephemeral runs and tests

pub mod file;
pub mod keyring;
pub mod memory;
mod record;

pub use self::file::FileKeyStore;
pub use self::keyring::KeyringKeyStore;
pub use self::memory::MemoryKeyStore;

use crate::cipher::CipherKey;
use crate::config::{InventoryConfig, KeystoreBackend};
use crate::error::{ConfigError, KeystoreError};
use chrono::{DateTime, Utc};
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

const MAX_ALIAS_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAlgorithm {
    Ed25519,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPurpose {
    Sign,
    Verify,
}

impl KeyPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Verify => "verify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDigest {
    Sha256,
    Sha512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    PrivateKey,
    Secret,
}

/// Parameters for generating a key pair inside a keystore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenSpec {
    pub alias: String,
    pub algorithm: KeyAlgorithm,
    pub purposes: Vec<KeyPurpose>,
    pub digests: Vec<KeyDigest>,
}

impl KeyGenSpec {
    pub fn new(alias: impl Into<String>, purposes: &[KeyPurpose]) -> Self {
        Self {
            alias: alias.into(),
            algorithm: KeyAlgorithm::Ed25519,
            purposes: purposes.to_vec(),
            digests: Vec::new(),
        }
    }

    pub fn with_digests(mut self, digests: &[KeyDigest]) -> Self {
        self.digests = digests.to_vec();
        self
    }

    /// Sign + verify, SHA-256 and SHA-512.
    pub fn signing(alias: impl Into<String>) -> Self {
        Self::new(alias, &[KeyPurpose::Sign, KeyPurpose::Verify])
            .with_digests(&[KeyDigest::Sha256, KeyDigest::Sha512])
    }
}

/// A private key held by a keystore, with the usage it was generated for.
#[derive(Clone)]
pub struct PrivateKeyEntry {
    alias: String,
    signing_key: SigningKey,
    purposes: Vec<KeyPurpose>,
    digests: Vec<KeyDigest>,
    created_at: DateTime<Utc>,
}

impl PrivateKeyEntry {
    pub(crate) fn generate(spec: &KeyGenSpec) -> Result<Self, KeystoreError> {
        validate_alias(&spec.alias)?;
        if spec.purposes.is_empty() {
            return Err(KeystoreError::Generation(
                "key generation spec grants no purposes".into(),
            ));
        }
        Ok(Self {
            alias: spec.alias.clone(),
            signing_key: SigningKey::generate(&mut OsRng),
            purposes: spec.purposes.clone(),
            digests: spec.digests.clone(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn from_parts(
        alias: String,
        signing_key: SigningKey,
        purposes: Vec<KeyPurpose>,
        digests: Vec<KeyDigest>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alias,
            signing_key,
            purposes,
            digests,
            created_at,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ed25519
    }

    pub fn purposes(&self) -> &[KeyPurpose] {
        &self.purposes
    }

    pub fn digests(&self) -> &[KeyDigest] {
        &self.digests
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// PKCS#8 DER encoding of the private key.
    pub fn encoded(&self) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
        let document = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|e| KeystoreError::Encoding(format!("pkcs8 encode: {e}")))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    pub fn cipher_key(&self) -> Result<CipherKey, KeystoreError> {
        let encoded = self.encoded()?;
        CipherKey::from_encoded_private_key(&encoded)
    }

    pub fn sign(&self, message: &[u8]) -> Result<Signature, KeystoreError> {
        self.require(KeyPurpose::Sign)?;
        Ok(self.signing_key.sign(message))
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), KeystoreError> {
        self.require(KeyPurpose::Verify)?;
        self.signing_key
            .verifying_key()
            .verify(message, signature)
            .map_err(|_| KeystoreError::SignatureVerification)
    }

    fn require(&self, purpose: KeyPurpose) -> Result<(), KeystoreError> {
        if self.purposes.contains(&purpose) {
            Ok(())
        } else {
            Err(KeystoreError::PurposeNotAllowed {
                alias: self.alias.clone(),
                purpose: purpose.as_str(),
            })
        }
    }
}

impl fmt::Debug for PrivateKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyEntry")
            .field("alias", &self.alias)
            .field("public_key", &hex::encode(self.verifying_key().to_bytes()))
            .field("purposes", &self.purposes)
            .field("digests", &self.digests)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Opaque secret material stored under an alias. Not usable as a cipher key
/// source.
#[derive(Clone)]
pub struct SecretEntry {
    alias: String,
    material: Zeroizing<Vec<u8>>,
    created_at: DateTime<Utc>,
}

impl SecretEntry {
    pub fn new(alias: impl Into<String>, material: &[u8]) -> Result<Self, KeystoreError> {
        let alias = alias.into();
        validate_alias(&alias)?;
        Ok(Self {
            alias,
            material: Zeroizing::new(material.to_vec()),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn from_parts(
        alias: String,
        material: Zeroizing<Vec<u8>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alias,
            material,
            created_at,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) fn material(&self) -> &[u8] {
        &self.material
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretEntry")
            .field("alias", &self.alias)
            .field("len", &self.material.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum KeyEntry {
    PrivateKey(PrivateKeyEntry),
    Secret(SecretEntry),
}

impl KeyEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::PrivateKey(_) => EntryKind::PrivateKey,
            Self::Secret(_) => EntryKind::Secret,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            Self::PrivateKey(entry) => entry.alias(),
            Self::Secret(entry) => entry.alias(),
        }
    }
}

/// Public half of a freshly generated pair. The private key stays in the
/// store and is read back through `get_entry`.
#[derive(Debug, Clone)]
pub struct KeyPairInfo {
    pub alias: String,
    pub public_key: VerifyingKey,
}

/// Keystore operations needed by the database bootstrap.
pub trait KeyStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Verify the store can be reached. Fails with `Unavailable` otherwise.
    fn load(&self) -> Result<(), KeystoreError>;

    fn get_entry(&self, alias: &str) -> Result<Option<KeyEntry>, KeystoreError>;

    /// Generate a pair inside the store under `spec.alias`, replacing any
    /// existing entry with that alias.
    fn generate_key_pair(&self, spec: &KeyGenSpec) -> Result<KeyPairInfo, KeystoreError>;
}

/// Outcome of resolving a cipher key from a keystore alias.
#[derive(Debug)]
pub enum KeyLookup {
    Found(CipherKey),
    NotFound,
    WrongType(EntryKind),
    /// An entry exists but its stored material cannot be decoded.
    Corrupt(KeystoreError),
    Failed(KeystoreError),
}

pub fn lookup_cipher_key(store: &dyn KeyStore, alias: &str) -> KeyLookup {
    match store.get_entry(alias) {
        Ok(Some(KeyEntry::PrivateKey(entry))) => match entry.cipher_key() {
            Ok(key) => KeyLookup::Found(key),
            Err(err) => KeyLookup::Corrupt(err),
        },
        Ok(Some(other)) => KeyLookup::WrongType(other.kind()),
        Ok(None) => KeyLookup::NotFound,
        Err(err @ (KeystoreError::Encoding(_) | KeystoreError::Serialization(_))) => {
            KeyLookup::Corrupt(err)
        }
        Err(err) => KeyLookup::Failed(err),
    }
}

/// Build the backend selected in config.
pub fn open_backend(config: &InventoryConfig) -> Result<Arc<dyn KeyStore>, ConfigError> {
    let store: Arc<dyn KeyStore> = match config.keystore.backend {
        KeystoreBackend::Keyring => Arc::new(KeyringKeyStore::new(&config.keystore.service)),
        KeystoreBackend::File => Arc::new(FileKeyStore::new(crate::paths::keystore_dir(
            &config.resolved_data_dir()?,
        ))),
        KeystoreBackend::Memory => Arc::new(MemoryKeyStore::new()),
    };
    Ok(store)
}

/// Aliases become keyring user names and file names, so keep them plain.
pub fn validate_alias(alias: &str) -> Result<(), KeystoreError> {
    if alias.is_empty() || alias.len() > MAX_ALIAS_LEN {
        return Err(KeystoreError::InvalidAlias(alias.to_string()));
    }
    if alias.starts_with('.') {
        return Err(KeystoreError::InvalidAlias(alias.to_string()));
    }
    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(KeystoreError::InvalidAlias(alias.to_string()));
    }
    Ok(())
}
