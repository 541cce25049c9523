//! Key-value backends for the record store.
//!
//! The store keeps each collection as one serialized value under a
//! well-known key, so a backend only needs string get/set plus an atomic
//! read-modify-write of a single key. [`SqliteKv`] is the durable backend and
//! may be shared by several processes; [`MemoryKv`] backs tests and can be
//! told to fail reads or reject writes like a broken or full disk would.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::data_dir;
use crate::error::StorageError;

pub trait KvBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Replace the value of `key` with what `change` returns for the current
    /// one, with no other writer in between. `None` leaves the key untouched.
    ///
    /// A failed read returns the error without calling `change`. Returns
    /// whether a value was written.
    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<bool, StorageError>;
}

/// How long a writer waits for another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed key-value table.
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    /// Open `<data_dir>/<file_name>`, creating file and schema if needed.
    pub fn open(file_name: &str) -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::DataDir(e.to_string()))?;
        Self::open_path(&dir.join(file_name))
    }

    pub fn open_path(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let kv = Self { conn };
        kv.migrate()?;
        Ok(kv)
    }

    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let kv = Self { conn };
        kv.migrate()?;
        Ok(kv)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Runs under `BEGIN IMMEDIATE`, so concurrent processes serialize on
    /// the write lock instead of overwriting each other's changes.
    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<bool, StorageError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let current = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        let Some(next) = change(current) else {
            return Ok(false);
        };
        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, next],
        )?;
        tx.commit()?;
        Ok(true)
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail, as a full quota would.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Make every following read fail, as an unreadable medium would.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Store a raw value, bypassing the reject switch.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::QueryFailed("memory backend poisoned".into()))
    }

    fn check_read(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed("read failed".into()));
        }
        Ok(())
    }

    fn check_write(&self, key: &str) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected {
                key: key.to_string(),
                reason: "quota exceeded".into(),
            });
        }
        Ok(())
    }
}

impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_read()?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_write(key)?;
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<bool, StorageError> {
        self.check_read()?;
        let mut entries = self.lock()?;
        let Some(next) = change(entries.get(key).cloned()) else {
            return Ok(false);
        };
        self.check_write(key)?;
        entries.insert(key.to_string(), next);
        Ok(true)
    }
}

impl<T: KvBackend + Sync> KvBackend for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }

    fn update(
        &self,
        key: &str,
        change: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<bool, StorageError> {
        (**self).update(key, change)
    }
}
