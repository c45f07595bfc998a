//! Application context
//!
//! Owns the keystore backend and the database bootstrapper for one process.
//! Construct it once at startup, share it by reference, and call `shutdown`
//! on exit.

use crate::bootstrap::DatabaseBootstrapper;
use crate::config::InventoryConfig;
use crate::database::InventoryDatabase;
use crate::error::{DatabaseError, Result};
use crate::keystore::{open_backend, KeyStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AppContext {
    bootstrapper: DatabaseBootstrapper,
}

impl AppContext {
    /// Build the keystore backend named in `config`.
    pub fn new(config: InventoryConfig) -> Result<Self> {
        config.validate()?;
        let keystore = open_backend(&config)?;
        Ok(Self::with_keystore(config, keystore))
    }

    pub fn with_keystore(config: InventoryConfig, keystore: Arc<dyn KeyStore>) -> Self {
        debug!(backend = keystore.name(), "application context created");
        Self {
            bootstrapper: DatabaseBootstrapper::new(config, keystore),
        }
    }

    pub fn database(&self) -> Result<Arc<InventoryDatabase>> {
        self.bootstrapper.get_database()
    }

    pub fn bootstrapper(&self) -> &DatabaseBootstrapper {
        &self.bootstrapper
    }

    pub fn config(&self) -> &InventoryConfig {
        self.bootstrapper.config()
    }

    /// Close the database if this context holds the last reference. Handles
    /// still held elsewhere keep the connection open until they drop.
    pub fn shutdown(self) -> std::result::Result<(), DatabaseError> {
        let Some(handle) = self.bootstrapper.into_handle() else {
            debug!("shutdown with no open database");
            return Ok(());
        };
        match Arc::try_unwrap(handle) {
            Ok(db) => {
                db.close()?;
                info!("database closed");
            }
            Err(shared) => {
                warn!(
                    refs = Arc::strong_count(&shared) - 1,
                    "database still referenced at shutdown; leaving it to close on drop"
                );
            }
        }
        Ok(())
    }
}
