//! Encrypted SQLite database
//!
//! Pages are encrypted by SQLCipher with the raw key derived in `cipher`.
//! Opening never falls back to plaintext: if the linked SQLite has no cipher
//! support the open fails.
//!
//! Schema versions are tracked in `PRAGMA user_version`. There are no
//! migrations; a file stamped with any other version is deleted and recreated
//! empty.

use crate::cipher::CipherKey;
use crate::config::DatabaseConfig;
use crate::error::DatabaseError;
use crate::models::{Item, NewItem};
use crate::paths::sidecar_paths;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What `open` had to do to produce a usable database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Existing file at the expected version.
    Opened,
    /// No usable file existed; a new one was created.
    Created,
    /// The file was at another version and was destroyed and recreated.
    Recreated { found_version: i64 },
}

pub struct InventoryDatabase {
    conn: Mutex<Connection>,
    path: PathBuf,
    schema_version: i64,
    key_fingerprint: String,
}

impl InventoryDatabase {
    /// Open or create the encrypted database at `path`.
    pub fn open(
        path: &Path,
        key: &CipherKey,
        config: &DatabaseConfig,
    ) -> Result<Self, DatabaseError> {
        Self::open_with_outcome(path, key, config).map(|(db, _)| db)
    }

    pub fn open_with_outcome(
        path: &Path,
        key: &CipherKey,
        config: &DatabaseConfig,
    ) -> Result<(Self, OpenOutcome), DatabaseError> {
        prepare_path(path)?;
        let target = config.schema_version;

        let (mut conn, table_count) = open_keyed(path, key, config)?;
        let found = user_version(&conn)?;

        let outcome = if found == target {
            OpenOutcome::Opened
        } else if found == 0 && table_count == 0 {
            create_schema(&mut conn, target)?;
            OpenOutcome::Created
        } else {
            warn!(
                path = %path.display(),
                found_version = found,
                expected_version = target,
                "schema version mismatch with no migration; recreating database"
            );
            conn.close().map_err(|(_, e)| DatabaseError::Sqlite(e))?;
            destroy_database_files(path)?;
            let (mut fresh, _) = open_keyed(path, key, config)?;
            create_schema(&mut fresh, target)?;
            conn = fresh;
            OpenOutcome::Recreated {
                found_version: found,
            }
        };

        info!(
            path = %path.display(),
            schema_version = target,
            key = %key.fingerprint(),
            ?outcome,
            "encrypted database ready"
        );

        Ok((
            Self {
                conn: Mutex::new(conn),
                path: path.to_path_buf(),
                schema_version: target,
                key_fingerprint: key.fingerprint(),
            },
            outcome,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    /// Fingerprint of the cipher key this handle was opened with.
    pub fn key_fingerprint(&self) -> &str {
        &self.key_fingerprint
    }

    /// Close the connection, flushing WAL state.
    pub fn close(self) -> Result<(), DatabaseError> {
        let conn = self.conn.into_inner();
        conn.close().map_err(|(_, e)| DatabaseError::Sqlite(e))?;
        debug!(path = %self.path.display(), "database closed");
        Ok(())
    }

    // ========================================================================
    // Items
    // ========================================================================

    pub fn insert_item(&self, item: &NewItem) -> Result<i64, DatabaseError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO items (name, price, quantity, supplier_name, supplier_email, supplier_phone)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.name,
                item.price,
                item.quantity,
                item.supplier_name,
                item.supplier_email,
                item.supplier_phone,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns false when no item has this id.
    pub fn update_item(&self, item: &Item) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE items SET name = ?1, price = ?2, quantity = ?3,
                 supplier_name = ?4, supplier_email = ?5, supplier_phone = ?6
             WHERE id = ?7",
            params![
                item.name,
                item.price,
                item.quantity,
                item.supplier_name,
                item.supplier_email,
                item.supplier_phone,
                item.id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_item(&self, id: i64) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn get_item(&self, id: i64) -> Result<Option<Item>, DatabaseError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, price, quantity, supplier_name, supplier_email, supplier_phone
             FROM items WHERE id = ?1",
            params![id],
            row_to_item,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All items ordered by name.
    pub fn all_items(&self) -> Result<Vec<Item>, DatabaseError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, price, quantity, supplier_name, supplier_email, supplier_phone
             FROM items ORDER BY name ASC",
        )?;
        let items = stmt
            .query_map([], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn item_count(&self) -> Result<u64, DatabaseError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    // ========================================================================
    // Key/value settings
    // ========================================================================

    pub fn get_value(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for InventoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryDatabase")
            .field("path", &self.path)
            .field("schema_version", &self.schema_version)
            .field("key", &self.key_fingerprint)
            .finish()
    }
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        quantity: row.get(3)?,
        supplier_name: row.get(4)?,
        supplier_email: row.get(5)?,
        supplier_phone: row.get(6)?,
    })
}

fn prepare_path(path: &Path) -> Result<(), DatabaseError> {
    if path.as_os_str().is_empty() {
        return Err(DatabaseError::InvalidPath("path must not be empty".into()));
    }
    if path.is_dir() {
        return Err(DatabaseError::InvalidPath(format!(
            "{} is a directory",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Open the file, apply the key and confirm it decrypts. Returns the number of
/// schema objects already present.
fn open_keyed(
    path: &Path,
    key: &CipherKey,
    config: &DatabaseConfig,
) -> Result<(Connection, i64), DatabaseError> {
    let conn = Connection::open(path)?;
    ensure_cipher_support(&conn)?;
    conn.pragma_update(None, "key", key.sqlcipher_literal().as_str())?;

    // First page read is where SQLCipher reports a wrong key.
    let table_count: i64 = match conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
        row.get(0)
    }) {
        Ok(count) => count,
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::NotADatabase => {
            return Err(DatabaseError::KeyMismatch(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = {};",
        config.journal_mode.pragma_value()
    ))?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok((conn, table_count))
}

fn ensure_cipher_support(conn: &Connection) -> Result<(), DatabaseError> {
    let version: Option<String> = conn
        .query_row("PRAGMA cipher_version", [], |row| row.get(0))
        .optional()?;
    match version {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(DatabaseError::EncryptionUnavailable),
    }
}

fn user_version(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn create_schema(conn: &mut Connection, version: i64) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            quantity INTEGER NOT NULL,
            supplier_name TEXT NOT NULL DEFAULT '',
            supplier_email TEXT NOT NULL DEFAULT '',
            supplier_phone TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_items_name ON items(name);

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;
    Ok(())
}

fn destroy_database_files(path: &Path) -> Result<(), DatabaseError> {
    let mut targets = vec![path.to_path_buf()];
    targets.extend(sidecar_paths(path));
    for target in targets {
        match fs::remove_file(&target) {
            Ok(()) => debug!(path = %target.display(), "removed database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
