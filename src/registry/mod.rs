//! Registry adapters for supported package ecosystems
//!
//! Every ecosystem exposes the same three concerns behind one trait: where
//! the changelog index lives, how a (path, version) unit maps to a
//! downloadable archive, and which symbol extractor understands its sources.
//! The worker pool and the orchestrator are written once and parameterized
//! by a [`Registry`] trait object.

mod cratesio;
mod gomod;
mod npm;

pub use cratesio::CratesIo;
pub use gomod::GoModules;
pub use npm::Npm;

use crate::archive::ArchiveKind;
use crate::config::RegistryConfig;
use crate::storage::PackageRecord;
use crate::symbols::{Symbol, SymbolExtractor};
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// One published (path, version) unit discovered in the index
///
/// Decoded from a single changelog line. The capitalized aliases accept the
/// Go module index spelling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VersionRecord {
    #[serde(alias = "Path")]
    pub path: String,

    #[serde(alias = "Version")]
    pub version: String,

    #[serde(rename = "timestamp", alias = "Timestamp")]
    pub published_at: DateTime<Utc>,
}

/// Module-path skip rules applied before a record is enqueued
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    /// Crawl internal packages when set
    pub allow_internal: bool,

    /// Additional substrings from configuration
    pub deny_substrings: Vec<String>,
}

impl SkipRules {
    /// Returns true if the module path should never be crawled
    pub fn matches(&self, module_path: &str) -> bool {
        if !self.allow_internal
            && (module_path.contains("/internal/") || module_path.ends_with("/internal"))
        {
            return true;
        }
        if module_path.contains("/vendor/") || module_path.starts_with("vendor/") {
            return true;
        }
        if module_path.contains("/testdata/") || module_path.ends_with("_test") {
            return true;
        }
        self.deny_substrings
            .iter()
            .any(|pattern| module_path.contains(pattern))
    }
}

/// A package ecosystem the crawler can walk
///
/// Implementations hold their endpoint bases (injectable for tests) and the
/// symbol extractor for their language.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Short ecosystem name used in logs
    fn name(&self) -> &'static str;

    /// Container format of this ecosystem's archives
    fn archive_kind(&self) -> ArchiveKind;

    /// Changelog index URL, optionally bounded by a `since` watermark
    fn changelog_url(&self, since: Option<DateTime<Utc>>) -> String;

    /// Returns true if the module path must not be enqueued
    fn should_skip(&self, module_path: &str) -> bool;

    /// Normalizes registry metadata for one unit
    ///
    /// Metadata endpoints are best-effort: failures fall back to a record
    /// synthesized from the version tuple and are not job failures.
    async fn fetch_metadata(&self, client: &Client, record: &VersionRecord) -> PackageRecord;

    /// Downloads the unit's distribution archive
    async fn download_archive(
        &self,
        client: &Client,
        record: &VersionRecord,
    ) -> crate::Result<Vec<u8>>;

    /// Runs the ecosystem's symbol extractor over an extracted tree
    fn parse_symbols(&self, dir: &Path) -> Vec<Symbol>;
}

/// Builds the configured registry variant
pub fn from_config(
    config: &RegistryConfig,
    extractor: Box<dyn SymbolExtractor>,
) -> Result<Arc<dyn Registry>, ConfigError> {
    let rules = SkipRules {
        allow_internal: config.allow_internal,
        deny_substrings: config.skip_paths.clone(),
    };
    match config.kind.as_str() {
        "go" => Ok(Arc::new(GoModules::new(
            config.index_url.clone(),
            config.download_url.clone(),
            rules,
            extractor,
        ))),
        "crates" => Ok(Arc::new(CratesIo::new(
            config.index_url.clone(),
            config.download_url.clone(),
            rules,
            extractor,
        ))),
        "npm" => Ok(Arc::new(Npm::new(
            config.index_url.clone(),
            config.download_url.clone(),
            rules,
            extractor,
        ))),
        other => Err(ConfigError::UnknownRegistry(other.to_string())),
    }
}

/// Synthesizes a metadata record from the version tuple alone
pub(crate) fn bare_record(record: &VersionRecord) -> PackageRecord {
    PackageRecord {
        name: record.path.clone(),
        version: record.version.clone(),
        ..Default::default()
    }
}

/// Fetches an archive blob, mapping non-success statuses to an error
pub(crate) async fn fetch_blob(
    client: &Client,
    url: &str,
    record: &VersionRecord,
) -> crate::Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| CrawlError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CrawlError::DownloadStatus {
            module: record.path.clone(),
            version: record.version.clone(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|source| CrawlError::Http {
        url: url.to_string(),
        source,
    })?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_record_accepts_go_index_spelling() {
        let record: VersionRecord = serde_json::from_str(
            r#"{"Path":"example.com/m","Version":"v1.2.3","Timestamp":"2024-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.path, "example.com/m");
        assert_eq!(record.version, "v1.2.3");
    }

    #[test]
    fn version_record_accepts_lowercase_spelling() {
        let record: VersionRecord = serde_json::from_str(
            r#"{"path":"left-pad","version":"1.3.0","timestamp":"2024-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.path, "left-pad");
    }

    #[test]
    fn skip_rules_exclude_internal_by_default() {
        let rules = SkipRules::default();
        assert!(rules.matches("example.com/x/internal/util"));
        assert!(rules.matches("example.com/x/internal"));
        assert!(!rules.matches("example.com/x/public"));
    }

    #[test]
    fn skip_rules_allow_internal_override() {
        let rules = SkipRules {
            allow_internal: true,
            ..Default::default()
        };
        assert!(!rules.matches("example.com/x/internal/util"));
        // Vendor stays excluded regardless
        assert!(rules.matches("example.com/x/vendor/dep"));
    }

    #[test]
    fn skip_rules_exclude_vendor_and_test_paths() {
        let rules = SkipRules::default();
        assert!(rules.matches("vendor/golang.org/x/net"));
        assert!(rules.matches("example.com/pkg/testdata/fixtures"));
        assert!(rules.matches("example.com/pkg_test"));
    }

    #[test]
    fn skip_rules_honor_configured_substrings() {
        let rules = SkipRules {
            deny_substrings: vec!["deprecated".to_string()],
            ..Default::default()
        };
        assert!(rules.matches("example.com/deprecated/old"));
        assert!(!rules.matches("example.com/current"));
    }
}
