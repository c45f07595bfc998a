//! Error types for the inventory data layer

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by keystore backends
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Keystore unavailable: {0}")]
    Unavailable(String),

    #[error("Keystore backend error: {0}")]
    Backend(String),

    #[error("Invalid key alias: {0}")]
    InvalidAlias(String),

    #[error("Key encoding error: {0}")]
    Encoding(String),

    #[error("Key generation failed: {0}")]
    Generation(String),

    #[error("Key '{alias}' is not authorized for {purpose}")]
    PurposeNotAllowed { alias: String, purpose: &'static str },

    #[error("Signature verification failed")]
    SignatureVerification,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while opening or using the encrypted database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite was built without SQLCipher; refusing to open an unencrypted database")]
    EncryptionUnavailable,

    #[error("Cipher key does not match database at {0}")]
    KeyMismatch(PathBuf),

    #[error("Invalid database path: {0}")]
    InvalidPath(String),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot determine data directory")]
    NoDataDir,

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Fatal initialization errors surfaced by the bootstrapper
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Keystore unavailable: {0}")]
    KeystoreUnavailable(#[source] KeystoreError),

    #[error("Key creation failed for alias '{alias}': {reason}")]
    KeyCreationFailure { alias: String, reason: String },

    #[error("Stored key under alias '{alias}' is corrupt: {source}")]
    CorruptKey {
        alias: String,
        #[source]
        source: KeystoreError,
    },

    #[error("No cipher key available under alias '{alias}' after key generation")]
    MissingCipherKey { alias: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
