//! # Ledger Store
//!
//! **Durable snapshot of the account table**
//!
//! The ledger rewrites the full table after every mutation. The file store
//! makes that crash-safe:
//!
//! 1. Serialize the table to `<path>.tmp`
//! 2. `sync_all` the temporary file
//! 3. Rename it over `<path>` (atomic on the same filesystem)
//!
//! A crash at any point leaves either the old or the new table on disk,
//! never a torn one.
//!
//! ## Format
//!
//! ```text
//! {
//!   "version": 1,
//!   "accounts": [
//!     { "key": { "known": "<uid>" }, "display_name": "Alex", "balance": 4 },
//!     { "key": { "pending": "sam" }, "display_name": "Sam", "balance": 2 }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::account::{AccountKey, PlayerAccount};
use crate::error::{EconomyError, EconomyResult};

/// Current ledger file format version.
pub const STORE_VERSION: u32 = 1;

/// The account table as held in memory.
pub type AccountTable = BTreeMap<AccountKey, PlayerAccount>;

/// Durable storage for the account table.
pub trait AccountStore: Send + Sync {
    /// Loads the full table. A store that has never been written is empty.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidStore` if stored data cannot be decoded.
    fn load(&self) -> EconomyResult<AccountTable>;

    /// Replaces the stored table. Must be durable when it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::PersistenceFailure` if the write did not complete.
    fn save(&self, table: &AccountTable) -> EconomyResult<()>;
}

impl<S: AccountStore + ?Sized> AccountStore for Arc<S> {
    fn load(&self) -> EconomyResult<AccountTable> {
        (**self).load()
    }

    fn save(&self, table: &AccountTable) -> EconomyResult<()> {
        (**self).save(table)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredRecord {
    key: AccountKey,
    #[serde(flatten)]
    account: PlayerAccount,
}

#[derive(Serialize, Deserialize)]
struct StoredLedger {
    version: u32,
    accounts: Vec<StoredRecord>,
}

fn encode(table: &AccountTable) -> StoredLedger {
    StoredLedger {
        version: STORE_VERSION,
        accounts: table
            .iter()
            .map(|(key, account)| StoredRecord {
                key: key.clone(),
                account: account.clone(),
            })
            .collect(),
    }
}

fn decode(stored: StoredLedger) -> EconomyResult<AccountTable> {
    if stored.version != STORE_VERSION {
        return Err(EconomyError::InvalidStore(format!(
            "unsupported ledger version: {}",
            stored.version
        )));
    }
    let mut table = AccountTable::new();
    for record in stored.accounts {
        if table.insert(record.key.clone(), record.account).is_some() {
            return Err(EconomyError::InvalidStore(format!(
                "duplicate account {}",
                record.key
            )));
        }
    }
    Ok(table)
}

/// JSON file store with atomic replace.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store for `path`. Parent directories are created on first save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_snapshot(&self, table: &AccountTable) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &encode(table))?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl AccountStore for JsonFileStore {
    fn load(&self) -> EconomyResult<AccountTable> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AccountTable::new()),
            Err(e) => {
                return Err(EconomyError::InvalidStore(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };
        let stored: StoredLedger = serde_json::from_slice(&bytes).map_err(|e| {
            EconomyError::InvalidStore(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        decode(stored)
    }

    fn save(&self, table: &AccountTable) -> EconomyResult<()> {
        self.write_snapshot(table).map_err(|e| {
            EconomyError::PersistenceFailure(format!("{}: {e}", self.path.display()))
        })
    }
}

/// In-memory store for tests and simulations.
///
/// Keeps the last saved JSON document so round-trips go through the same
/// encoding as the file store. Writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
    saves: Mutex<u64>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with `table`.
    #[must_use]
    pub fn with_table(table: &AccountTable) -> Self {
        let store = Self::new();
        *store.document.lock() = serde_json::to_string(&encode(table)).ok();
        store
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

impl AccountStore for MemoryStore {
    fn load(&self) -> EconomyResult<AccountTable> {
        match self.document.lock().as_deref() {
            None => Ok(AccountTable::new()),
            Some(doc) => {
                let stored: StoredLedger = serde_json::from_str(doc)
                    .map_err(|e| EconomyError::InvalidStore(e.to_string()))?;
                decode(stored)
            }
        }
    }

    fn save(&self, table: &AccountTable) -> EconomyResult<()> {
        if *self.fail_writes.lock() {
            return Err(EconomyError::PersistenceFailure("simulated write failure".to_string()));
        }
        let doc = serde_json::to_string(&encode(table))
            .map_err(|e| EconomyError::PersistenceFailure(e.to_string()))?;
        *self.document.lock() = Some(doc);
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::PlayerUid;

    fn sample_table() -> AccountTable {
        let mut table = AccountTable::new();
        table.insert(AccountKey::known(&PlayerUid::new("u1")), PlayerAccount::new("Alex", 4));
        table.insert(AccountKey::pending("Sam"), PlayerAccount::new("Sam", 2));
        table
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("tokens.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moddata").join("tokens.json");
        let table = sample_table();

        JsonFileStore::new(&path).save(&table).unwrap();
        assert!(path.exists());
        assert!(!path.with_file_name("tokens.json.tmp").exists());

        let reloaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_file_format_is_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        JsonFileStore::new(&path).save(&sample_table()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["accounts"][0]["key"]["known"], "u1");
        assert_eq!(value["accounts"][0]["display_name"], "Alex");
        assert_eq!(value["accounts"][0]["balance"], 4);
        assert_eq!(value["accounts"][1]["key"]["pending"], "sam");
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"version": 7, "accounts": []}"#).unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(EconomyError::InvalidStore(_))
        ));
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(EconomyError::InvalidStore(_))
        ));
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let store = MemoryStore::with_table(&sample_table());
        assert_eq!(store.load().unwrap(), sample_table());

        store.set_fail_writes(true);
        assert!(matches!(
            store.save(&AccountTable::new()),
            Err(EconomyError::PersistenceFailure(_))
        ));
        assert_eq!(store.load().unwrap(), sample_table());
        assert_eq!(store.save_count(), 0);

        store.set_fail_writes(false);
        store.save(&AccountTable::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.save_count(), 1);
    }
}
