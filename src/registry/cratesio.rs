//! crates.io adapter
//!
//! Crates are served as `.crate` files (tar+gzip) from the static download
//! endpoint; descriptions and links come from the JSON API.

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
struct CrateResponse {
    #[serde(rename = "crate")]
    krate: CrateData,
}

#[derive(Debug, Deserialize)]
struct CrateData {
    description: Option<String>,
    homepage: Option<String>,
    repository: Option<String>,
}

pub struct CratesIo {
    index_url: String,
    api_base: String,
    rules: SkipRules,
    extractor: Box<dyn SymbolExtractor>,
}

impl CratesIo {
    pub fn new(
        index_url: String,
        api_base: String,
        rules: SkipRules,
        extractor: Box<dyn SymbolExtractor>,
    ) -> Self {
        Self {
            index_url,
            api_base,
            rules,
            extractor,
        }
    }

    fn archive_url(&self, record: &VersionRecord) -> String {
        format!(
            "{}/api/v1/crates/{}/{}/download",
            self.api_base.trim_end_matches('/'),
            record.path,
            record.version
        )
    }

    fn metadata_url(&self, record: &VersionRecord) -> String {
        format!(
            "{}/api/v1/crates/{}",
            self.api_base.trim_end_matches('/'),
            record.path
        )
    }
}

#[async_trait]
impl Registry for CratesIo {
    fn name(&self) -> &'static str {
        "crates"
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

        let response = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::debug!(
                    "Metadata for {} returned HTTP {}, using bare record",
                    record.path,
                    response.status()
                );
                return package;
            }
            Err(e) => {
                tracing::debug!("Metadata fetch for {} failed: {}, using bare record", record.path, e);
                return package;
            }
        };

        match response.json::<CrateResponse>().await {
            Ok(data) => {
                package.description = data.krate.description;
                package.homepage = data.krate.homepage;
                package.repository_url = data.krate.repository;
            }
            Err(e) => {
                tracing::debug!("Metadata decode for {} failed: {}", record.path, e);
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NullExtractor;

    impl SymbolExtractor for NullExtractor {
        fn parse_file(&self, _path: &Path) -> std::io::Result<Vec<Symbol>> {
            Ok(vec![])
        }
        fn matches(&self, _path: &Path) -> bool {
            false
        }
    }

    fn test_record() -> VersionRecord {
        VersionRecord {
            path: "serde".to_string(),
            version: "1.0.200".to_string(),
            published_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn archive_url_follows_download_layout() {
        let registry = CratesIo::new(
            "https://index.example.test".to_string(),
            "https://crates.example.test".to_string(),
            SkipRules::default(),
            Box::new(NullExtractor),
        );
        assert_eq!(
            registry.archive_url(&test_record()),
            "https://crates.example.test/api/v1/crates/serde/1.0.200/download"
        );
    }

    #[tokio::test]
    async fn metadata_is_decoded_from_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/crates/serde"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"crate":{"description":"Serialization framework","homepage":"https://serde.rs","repository":"https://github.com/serde-rs/serde"}}"#,
            ))
            .mount(&server)
            .await;

        let registry = CratesIo::new(
            "https://index.example.test".to_string(),
            server.uri(),
            SkipRules::default(),
            Box::new(NullExtractor),
        );
        let package = registry
            .fetch_metadata(&Client::new(), &test_record())
            .await;

        assert_eq!(
            package.description.as_deref(),
            Some("Serialization framework")
        );
        assert_eq!(package.homepage.as_deref(), Some("https://serde.rs"));
    }

    #[tokio::test]
    async fn metadata_failure_falls_back_to_bare_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/crates/serde"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = CratesIo::new(
            "https://index.example.test".to_string(),
            server.uri(),
            SkipRules::default(),
            Box::new(NullExtractor),
        );
        let package = registry
            .fetch_metadata(&Client::new(), &test_record())
            .await;

        assert_eq!(package.name, "serde");
        assert!(package.description.is_none());
    }
}
