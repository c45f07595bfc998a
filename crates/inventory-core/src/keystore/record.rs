//! On-disk / in-keyring representation of a key entry.

use super::{
    EntryKind, KeyAlgorithm, KeyDigest, KeyEntry, KeyPurpose, PrivateKeyEntry, SecretEntry,
};
use crate::error::KeystoreError;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub(crate) const RECORD_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub(crate) struct StoredKeyRecord {
    #[zeroize(skip)]
    version: u32,
    #[zeroize(skip)]
    kind: EntryKind,
    #[zeroize(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    algorithm: Option<KeyAlgorithm>,
    /// Base64 of the PKCS#8 DER for private keys, of the raw bytes for secrets.
    material: String,
    #[zeroize(skip)]
    #[serde(default)]
    purposes: Vec<KeyPurpose>,
    #[zeroize(skip)]
    #[serde(default)]
    digests: Vec<KeyDigest>,
    #[zeroize(skip)]
    created_at: DateTime<Utc>,
}

impl StoredKeyRecord {
    pub(crate) fn from_entry(entry: &KeyEntry) -> Result<Self, KeystoreError> {
        let record = match entry {
            KeyEntry::PrivateKey(key) => {
                let encoded = key.encoded()?;
                Self {
                    version: RECORD_VERSION,
                    kind: EntryKind::PrivateKey,
                    algorithm: Some(key.algorithm()),
                    material: general_purpose::STANDARD.encode(encoded.as_slice()),
                    purposes: key.purposes().to_vec(),
                    digests: key.digests().to_vec(),
                    created_at: key.created_at(),
                }
            }
            KeyEntry::Secret(secret) => Self {
                version: RECORD_VERSION,
                kind: EntryKind::Secret,
                algorithm: None,
                material: general_purpose::STANDARD.encode(secret.material()),
                purposes: Vec::new(),
                digests: Vec::new(),
                created_at: secret.created_at(),
            },
        };
        Ok(record)
    }

    pub(crate) fn into_entry(self, alias: &str) -> Result<KeyEntry, KeystoreError> {
        if self.version != RECORD_VERSION {
            return Err(KeystoreError::Encoding(format!(
                "unsupported key record version {}",
                self.version
            )));
        }
        let material = Zeroizing::new(
            general_purpose::STANDARD
                .decode(self.material.as_bytes())
                .map_err(|e| KeystoreError::Encoding(format!("decode key material: {e}")))?,
        );
        match self.kind {
            EntryKind::PrivateKey => {
                match self.algorithm {
                    Some(KeyAlgorithm::Ed25519) => {}
                    None => {
                        return Err(KeystoreError::Encoding(
                            "private key record has no algorithm".into(),
                        ))
                    }
                }
                let signing_key = SigningKey::from_pkcs8_der(&material)
                    .map_err(|e| KeystoreError::Encoding(format!("pkcs8 decode: {e}")))?;
                Ok(KeyEntry::PrivateKey(PrivateKeyEntry::from_parts(
                    alias.to_string(),
                    signing_key,
                    self.purposes.clone(),
                    self.digests.clone(),
                    self.created_at,
                )))
            }
            EntryKind::Secret => Ok(KeyEntry::Secret(SecretEntry::from_parts(
                alias.to_string(),
                material,
                self.created_at,
            ))),
        }
    }

    pub(crate) fn to_json(&self) -> Result<Zeroizing<String>, KeystoreError> {
        Ok(Zeroizing::new(serde_json::to_string(self)?))
    }

    pub(crate) fn from_json(data: &[u8]) -> Result<Self, KeystoreError> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::KeyGenSpec;

    #[test]
    fn private_key_record_preserves_key_and_usage() {
        let entry = PrivateKeyEntry::generate(&KeyGenSpec::signing("item_key")).unwrap();
        let expected_public = entry.verifying_key();
        let json = StoredKeyRecord::from_entry(&KeyEntry::PrivateKey(entry))
            .unwrap()
            .to_json()
            .unwrap();

        let restored = StoredKeyRecord::from_json(json.as_bytes())
            .unwrap()
            .into_entry("item_key")
            .unwrap();
        let KeyEntry::PrivateKey(restored) = restored else {
            panic!("expected a private key entry");
        };
        assert_eq!(restored.verifying_key(), expected_public);
        assert_eq!(restored.purposes(), &[KeyPurpose::Sign, KeyPurpose::Verify]);
        assert_eq!(restored.digests(), &[KeyDigest::Sha256, KeyDigest::Sha512]);
    }

    #[test]
    fn secret_record_keeps_its_kind() {
        let secret = SecretEntry::new("item_key", b"opaque").unwrap();
        let json = StoredKeyRecord::from_entry(&KeyEntry::Secret(secret))
            .unwrap()
            .to_json()
            .unwrap();
        let restored = StoredKeyRecord::from_json(json.as_bytes())
            .unwrap()
            .into_entry("item_key")
            .unwrap();
        assert_eq!(restored.kind(), EntryKind::Secret);
    }

    #[test]
    fn rejects_unknown_record_version() {
        let json = r#"{"version":9,"kind":"secret","material":"","created_at":"2024-01-01T00:00:00Z"}"#;
        let err = StoredKeyRecord::from_json(json.as_bytes())
            .unwrap()
            .into_entry("item_key")
            .unwrap_err();
        assert!(matches!(err, KeystoreError::Encoding(_)));
    }

    #[test]
    fn rejects_garbage_key_material() {
        let json = r#"{"version":1,"kind":"private_key","algorithm":"ed25519","material":"bm90IGEga2V5","created_at":"2024-01-01T00:00:00Z"}"#;
        let err = StoredKeyRecord::from_json(json.as_bytes())
            .unwrap()
            .into_entry("item_key")
            .unwrap_err();
        assert!(matches!(err, KeystoreError::Encoding(_)));
    }
}
