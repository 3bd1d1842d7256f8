//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::PackageRecord;
use crate::symbols::Symbol;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Package not found: {0}")]
    PackageNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Implementations must be safe for concurrent calls from multiple workers;
/// the crawler never upserts the same package from two workers at once, but
/// upserts of different packages run in parallel with no ordering promise.
pub trait PackageStore: Send + Sync {
    // ===== Package Management =====

    /// Inserts or updates a package record, returning its ID
    ///
    /// The record's metadata replaces whatever was stored for the same
    /// package name. Symbols are not written by this call.
    fn upsert_package(&self, record: &PackageRecord) -> StorageResult<i64>;

    /// Deletes every symbol attached to a package
    fn delete_package_symbols(&self, package_id: i64) -> StorageResult<()>;

    /// Attaches one symbol to a package
    fn upsert_symbol(&self, package_id: i64, symbol: &Symbol) -> StorageResult<()>;

    /// Records an import edge between two packages
    fn add_import(&self, importer: &str, imported: &str, module: &str) -> StorageResult<()>;

    // ===== Crawl Metadata =====

    /// Returns the watermark of the last successful crawl, if any
    ///
    /// Absence means the next run is a full crawl.
    fn get_last_crawl_time(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Persists the watermark after a successful crawl
    fn set_last_crawl_time(&self, time: DateTime<Utc>) -> StorageResult<()>;
}
