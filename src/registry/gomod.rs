//! Go module index adapter
//!
//! The Go ecosystem publishes a line-delimited changelog of
//! (path, version, timestamp) tuples and serves module zips from a proxy.
//! There is no separate metadata endpoint; the record is synthesized from
//! the version tuple.

use crate::archive::ArchiveKind;
use crate::registry::{bare_record, fetch_blob, Registry, SkipRules, VersionRecord};
use crate::storage::PackageRecord;
use crate::symbols::{Symbol, SymbolExtractor};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use std::path::Path;

pub struct GoModules {
    index_url: String,
    download_base: String,
    rules: SkipRules,
    extractor: Box<dyn SymbolExtractor>,
}

impl GoModules {
    pub fn new(
        index_url: String,
        download_base: String,
        rules: SkipRules,
        extractor: Box<dyn SymbolExtractor>,
    ) -> Self {
        Self {
            index_url,
            download_base,
            rules,
            extractor,
        }
    }

    fn archive_url(&self, record: &VersionRecord) -> String {
        format!(
            "{}/{}/@v/{}.zip",
            self.download_base.trim_end_matches('/'),
            record.path,
            record.version
        )
    }
}

#[async_trait]
impl Registry for GoModules {
    fn name(&self) -> &'static str {
        "go"
    }

    fn archive_kind(&self) -> ArchiveKind {
        ArchiveKind::Zip
    }

    fn changelog_url(&self, since: Option<DateTime<Utc>>) -> String {
        match since {
            Some(since) => format!(
                "{}?since={}",
                self.index_url,
                since.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => self.index_url.clone(),
        }
    }

    fn should_skip(&self, module_path: &str) -> bool {
        self.rules.matches(module_path)
    }

    async fn fetch_metadata(&self, _client: &Client, record: &VersionRecord) -> PackageRecord {
        let mut package = bare_record(record);
        // Module paths double as repository locations for the common hosts
        if record.path.starts_with("github.com/") || record.path.starts_with("gitlab.com/") {
            package.repository_url = Some(format!("https://{}", record.path));
        }
        package
    }

    async fn download_archive(
        &self,
        client: &Client,
        record: &VersionRecord,
    ) -> crate::Result<Vec<u8>> {
        fetch_blob(client, &self.archive_url(record), record).await
    }

    fn parse_symbols(&self, dir: &Path) -> Vec<Symbol> {
        self.extractor.parse_directory(dir)
    }
}
