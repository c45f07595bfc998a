//! Database cipher key derivation
//!
//! The key is SHA-256 over a domain tag and the PKCS#8 encoding of the
//! keystore's private key. The input already carries 256 bits of entropy, so a
//! single hash is enough; the tag keeps this key distinct from any other use of
//! the same private key. The result is handed to SQLCipher as a raw key, which
//! skips its passphrase KDF.

use crate::error::KeystoreError;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

pub const CIPHER_KEY_LEN: usize = 32;

const DERIVATION_DOMAIN: &[u8] = b"inventory-db-cipher-v1";

pub struct CipherKey(Zeroizing<[u8; CIPHER_KEY_LEN]>);

impl CipherKey {
    pub fn from_encoded_private_key(encoded: &[u8]) -> Result<Self, KeystoreError> {
        if encoded.is_empty() {
            return Err(KeystoreError::Encoding(
                "private key has no exportable encoding".into(),
            ));
        }
        let mut hasher = Sha256::new();
        hasher.update(DERIVATION_DOMAIN);
        hasher.update(encoded);
        let mut key = Zeroizing::new([0u8; CIPHER_KEY_LEN]);
        key.copy_from_slice(&hasher.finalize());
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; CIPHER_KEY_LEN] {
        &self.0
    }

    /// Short, non-reversible identifier safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_slice());
        hex::encode(&digest[..8])
    }

    /// SQLCipher raw-key literal: `x'<64 hex digits>'`.
    pub(crate) fn sqlcipher_literal(&self) -> Zeroizing<String> {
        let hex = Zeroizing::new(hex::encode(self.0.as_slice()));
        Zeroizing::new(format!("x'{}'", hex.as_str()))
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherKey({})", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = CipherKey::from_encoded_private_key(b"encoded-key").unwrap();
        let b = CipherKey::from_encoded_private_key(b"encoded-key").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_inputs_give_different_keys() {
        let a = CipherKey::from_encoded_private_key(b"key-one").unwrap();
        let b = CipherKey::from_encoded_private_key(b"key-two").unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn empty_encoding_is_rejected() {
        assert!(matches!(
            CipherKey::from_encoded_private_key(&[]),
            Err(KeystoreError::Encoding(_))
        ));
    }

    #[test]
    fn literal_and_debug_forms() {
        let key = CipherKey::from_encoded_private_key(b"encoded-key").unwrap();
        let literal = key.sqlcipher_literal();
        assert!(literal.starts_with("x'"));
        assert!(literal.ends_with('\''));
        assert_eq!(literal.len(), 2 + CIPHER_KEY_LEN * 2 + 1);

        let debug = format!("{key:?}");
        assert!(!debug.contains(&hex::encode(key.as_bytes())));
        assert!(debug.contains(&key.fingerprint()));
    }
}
