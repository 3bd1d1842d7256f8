//! npm registry adapter
//!
//! Tarballs live under `{registry}/{name}/-/{basename}-{version}.tgz`; the
//! per-version document carries the metadata. Scoped package names keep
//! their scope in the document path but drop it in the tarball basename.

use crate::archive::ArchiveKind;
use crate::registry::{bare_record, fetch_blob, Registry, SkipRules, VersionRecord};
use crate::storage::PackageRecord;
use crate::symbols::{Symbol, SymbolExtractor};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct VersionDoc {
    description: Option<String>,
    license: Option<String>,
    homepage: Option<String>,
    repository: Option<RepositoryDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryDoc {
    Url(String),
    Object { url: String },
}

pub struct Npm {
    index_url: String,
    registry_base: String,
    rules: SkipRules,
    extractor: Box<dyn SymbolExtractor>,
}

impl Npm {
    pub fn new(
        index_url: String,
        registry_base: String,
        rules: SkipRules,
        extractor: Box<dyn SymbolExtractor>,
    ) -> Self {
        Self {
            index_url,
            registry_base,
            rules,
            extractor,
        }
    }

    fn basename(name: &str) -> &str {
        name.rsplit('/').next().unwrap_or(name)
    }

    fn archive_url(&self, record: &VersionRecord) -> String {
        format!(
            "{}/{}/-/{}-{}.tgz",
            self.registry_base.trim_end_matches('/'),
            record.path,
            Self::basename(&record.path),
            record.version
        )
    }

    fn metadata_url(&self, record: &VersionRecord) -> String {
        format!(
            "{}/{}/{}",
            self.registry_base.trim_end_matches('/'),
            record.path,
            record.version
        )
    }
}

#[async_trait]
impl Registry for Npm {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn archive_kind(&self) -> ArchiveKind {
        ArchiveKind::TarGz
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

    async fn fetch_metadata(&self, client: &Client, record: &VersionRecord) -> PackageRecord {
        let mut package = bare_record(record);
        let url = self.metadata_url(record);

        let doc = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<VersionDoc>().await.ok()
            }
            Ok(response) => {
                tracing::debug!(
                    "Metadata for {} returned HTTP {}, using bare record",
                    record.path,
                    response.status()
                );
                None
            }
            Err(e) => {
                tracing::debug!("Metadata fetch for {} failed: {}, using bare record", record.path, e);
                None
            }
        };

        if let Some(doc) = doc {
            package.description = doc.description;
            package.license = doc.license;
            package.homepage = doc.homepage;
            package.repository_url = doc.repository.map(|repo| match repo {
                RepositoryDoc::Url(url) => url,
                RepositoryDoc::Object { url } => url,
            });
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
