//! In-memory storage backend
//!
//! Used by the integration tests and as the default store wired by the CLI
//! when no external backend is configured. All state lives behind a single
//! mutex; the crawler's write volume is archive-bound, not store-bound, so
//! contention is not a concern here.

use crate::storage::{PackageRecord, PackageStore, StorageError, StorageResult};
use crate::symbols::Symbol;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    /// Package name -> ID
    ids: HashMap<String, i64>,
    packages: HashMap<i64, PackageRecord>,
    symbols: HashMap<i64, Vec<Symbol>>,
    imports: Vec<(String, String, String)>,
    last_crawl_time: Option<DateTime<Utc>>,
}

/// Thread-safe in-memory implementation of [`PackageStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored symbols for a package name, if present
    pub fn symbols_for(&self, name: &str) -> Option<Vec<Symbol>> {
        let inner = self.inner.lock().unwrap();
        let id = inner.ids.get(name)?;
        inner.symbols.get(id).cloned()
    }

    /// Returns the stored metadata for a package name, if present
    pub fn package_for(&self, name: &str) -> Option<PackageRecord> {
        let inner = self.inner.lock().unwrap();
        let id = inner.ids.get(name)?;
        inner.packages.get(id).cloned()
    }

    /// Returns the number of stored packages
    pub fn package_count(&self) -> usize {
        self.inner.lock().unwrap().packages.len()
    }

    /// Returns the recorded import edges
    pub fn imports(&self) -> Vec<(String, String, String)> {
        self.inner.lock().unwrap().imports.clone()
    }
}

impl PackageStore for MemoryStore {
    fn upsert_package(&self, record: &PackageRecord) -> StorageResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        let id = match inner.ids.get(&record.name) {
            Some(id) => *id,
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.ids.insert(record.name.clone(), id);
                id
            }
        };
        let mut stored = record.clone();
        // Symbols are written through upsert_symbol, not here
        stored.symbols = Vec::new();
        inner.packages.insert(id, stored);
        Ok(id)
    }

    fn delete_package_symbols(&self, package_id: i64) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.packages.contains_key(&package_id) {
            return Err(StorageError::PackageNotFound(package_id));
        }
        inner.symbols.remove(&package_id);
        Ok(())
    }

    fn upsert_symbol(&self, package_id: i64, symbol: &Symbol) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.packages.contains_key(&package_id) {
            return Err(StorageError::PackageNotFound(package_id));
        }
        inner
            .symbols
            .entry(package_id)
            .or_default()
            .push(symbol.clone());
        Ok(())
    }

    fn add_import(&self, importer: &str, imported: &str, module: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .imports
            .push((importer.to_string(), imported.to_string(), module.to_string()));
        Ok(())
    }

    fn get_last_crawl_time(&self) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.inner.lock().unwrap().last_crawl_time)
    }

    fn set_last_crawl_time(&self, time: DateTime<Utc>) -> StorageResult<()> {
        self.inner.lock().unwrap().last_crawl_time = Some(time);
        Ok(())
    }
}
