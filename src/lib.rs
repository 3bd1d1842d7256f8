//! Symdex: a package-ecosystem symbol crawler
//!
//! This crate implements a concurrent crawler that discovers published
//! package versions in a registry index, downloads and safely extracts their
//! distribution archives, runs a pluggable symbol extractor over the sources,
//! and persists the normalized result through a storage backend.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod registry;
pub mod stats;
pub mod storage;
pub mod symbols;

use thiserror::Error;

/// Main error type for symdex operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Index endpoint {url} returned HTTP {status}")]
    IndexStatus { url: String, status: u16 },

    #[error("Download for {module}@{version} returned HTTP {status}")]
    DownloadStatus {
        module: String,
        version: String,
        status: u16,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] archive::ArchiveError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawl cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown registry kind: {0}")]
    UnknownRegistry(String),
}

/// Result type alias for symdex operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Orchestrator;
pub use registry::{Registry, VersionRecord};
pub use stats::{CrawlStats, StatsSnapshot};
pub use storage::{PackageRecord, PackageStore};
pub use symbols::{Symbol, SymbolExtractor, SymbolKind};
