//! Encrypted inventory storage
//!
//! Opens a SQLCipher database whose key is derived from a signing key pair
//! held in a secure keystore. The pair is generated on first run and reused
//! afterwards; the database handle is built once per process and shared.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  AppContext                                  │
//! │  └── DatabaseBootstrapper (one-shot build)   │
//! │      ├── KeyStore (keyring | file | memory)  │
//! │      │   └── "item_key" ──► CipherKey        │
//! │      └── InventoryDatabase (SQLCipher)       │
//! │          └── "item_database", user_version 3 │
//! └──────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod cipher;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod keystore;
pub mod models;
pub mod paths;
pub mod settings;

pub use bootstrap::DatabaseBootstrapper;
pub use cipher::CipherKey;
pub use config::InventoryConfig;
pub use context::AppContext;
pub use database::{InventoryDatabase, OpenOutcome};
pub use error::{BootstrapError, ConfigError, DatabaseError, KeystoreError, Result};
pub use keystore::{KeyLookup, KeyStore};
pub use models::{Item, NewItem};
pub use settings::{load_settings, save_settings, Settings};
