//! Worker pool executing the per-version crawl pipeline
//!
//! Each worker owns its rate limiter and the temp directory of the job in
//! flight; the receiver end of the job queue is the only thing workers
//! share. A failed job is logged and counted, never propagated, so one bad
//! module cannot take down the batch.

use crate::archive::{self, Limits};
use crate::crawler::limiter::TokenBucket;
use crate::registry::{Registry, VersionRecord};
use crate::stats::CrawlStats;
use crate::storage::PackageStore;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared dependencies handed to every worker
pub struct WorkerContext {
    pub client: Client,
    pub registry: Arc<dyn Registry>,
    pub store: Arc<dyn PackageStore>,
    pub stats: Arc<CrawlStats>,
    pub limits: Limits,
    pub temp_root: PathBuf,
    pub cancel: CancellationToken,
}

/// Per-worker rate limit settings
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub interval: Duration,
    pub burst: u32,
}

/// A fixed-size pool of crawl workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `count` workers consuming from `receiver`
    pub fn spawn(
        count: usize,
        rate: RateLimit,
        receiver: mpsc::Receiver<VersionRecord>,
        ctx: Arc<WorkerContext>,
    ) -> Self {
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..count.max(1))
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    let limiter = TokenBucket::new(rate.burst, rate.interval);
                    worker_loop(id, limiter, receiver, ctx).await;
                })
            })
            .collect();
        Self { handles }
    }

    /// Blocks until every worker has returned
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    id: usize,
    mut limiter: TokenBucket,
    receiver: Arc<Mutex<mpsc::Receiver<VersionRecord>>>,
    ctx: Arc<WorkerContext>,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        // Hold the receiver lock only for the receive itself
        let record = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => break,
                record = receiver.recv() => match record {
                    Some(record) => record,
                    None => break,
                },
            }
        };

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            _ = limiter.wait() => {}
        }

        // Cancellation drops the pipeline future at its next await point;
        // the job's temp directory goes with it.
        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            result = process_record(&record, &ctx) => result,
        };

        match result {
            Ok(symbols) => {
                tracing::info!(
                    "Indexed {}@{} ({} symbols)",
                    record.path,
                    record.version,
                    symbols
                );
                ctx.stats.record_success(symbols);
            }
            Err(e) => {
                tracing::error!(
                    module = %record.path,
                    version = %record.version,
                    "Crawl failed: {}",
                    e
                );
                ctx.stats.record_failure();
            }
        }
    }

    tracing::debug!("Worker {} exiting", id);
}

/// Runs the download → extract → parse → persist pipeline for one unit
///
/// The temp directory is scoped to this call and removed on every exit
/// path, including errors and cancellation.
async fn process_record(record: &VersionRecord, ctx: &WorkerContext) -> crate::Result<u64> {
    tracing::debug!("Downloading {}@{}", record.path, record.version);
    let bytes = ctx.registry.download_archive(&ctx.client, record).await?;

    std::fs::create_dir_all(&ctx.temp_root)?;
    let temp = tempfile::Builder::new()
        .prefix("symdex-")
        .tempdir_in(&ctx.temp_root)?;

    let report = archive::extract(&bytes, ctx.registry.archive_kind(), temp.path(), &ctx.limits)?;
    tracing::debug!(
        "Extracted {}@{}: {} files, {} skipped",
        record.path,
        record.version,
        report.files_written,
        report.entries_skipped
    );

    let symbols = ctx.registry.parse_symbols(temp.path());

    let package = ctx.registry.fetch_metadata(&ctx.client, record).await;
    let package_id = ctx.store.upsert_package(&package)?;
    ctx.store.delete_package_symbols(package_id)?;
    for symbol in &symbols {
        ctx.store.upsert_symbol(package_id, symbol)?;
    }

    Ok(symbols.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveKind;
    use crate::registry::bare_record;
    use crate::storage::{MemoryStore, PackageRecord};
    use crate::CrawlError;
    use crate::symbols::{Symbol, SymbolExtractor, SymbolKind};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::io::Write;
    use std::path::Path;

    /// Extractor indexing one symbol per non-empty line of `.go` files
    struct LineExtractor;

    impl SymbolExtractor for LineExtractor {
        fn parse_file(&self, path: &Path) -> std::io::Result<Vec<Symbol>> {
            let content = std::fs::read_to_string(path)?;
            Ok(content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.is_empty())
                .map(|(i, line)| Symbol {
                    name: line.to_string(),
                    kind: SymbolKind::Function,
                    signature: line.to_string(),
                    file_path: path.display().to_string(),
                    line: (i + 1) as u32,
                    is_public: true,
                    doc: None,
                })
                .collect())
        }

        fn matches(&self, path: &Path) -> bool {
            path.extension().is_some_and(|ext| ext == "go")
        }
    }

    /// Registry serving canned archives without touching the network
    struct CannedRegistry {
        archives: std::collections::HashMap<String, Vec<u8>>,
        extractor: LineExtractor,
    }

    #[async_trait]
    impl Registry for CannedRegistry {
        fn name(&self) -> &'static str {
            "canned"
        }
        fn archive_kind(&self) -> ArchiveKind {
            ArchiveKind::Zip
        }
        fn changelog_url(&self, _since: Option<DateTime<Utc>>) -> String {
            String::new()
        }
        fn should_skip(&self, _module_path: &str) -> bool {
            false
        }
        async fn fetch_metadata(&self, _client: &Client, record: &VersionRecord) -> PackageRecord {
            bare_record(record)
        }
        async fn download_archive(
            &self,
            _client: &Client,
            record: &VersionRecord,
        ) -> crate::Result<Vec<u8>> {
            self.archives
                .get(&record.path)
                .cloned()
                .ok_or(CrawlError::DownloadStatus {
                    module: record.path.clone(),
                    version: record.version.clone(),
                    status: 500,
                })
        }
        fn parse_symbols(&self, dir: &Path) -> Vec<Symbol> {
            self.extractor.parse_directory(dir)
        }
    }

    fn zip_with(lines: &[&str]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("main.go", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(lines.join("\n").as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn record(path: &str) -> VersionRecord {
        VersionRecord {
            path: path.to_string(),
            version: "v1.0.0".to_string(),
            published_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        }
    }

    fn context(registry: CannedRegistry, store: Arc<MemoryStore>) -> Arc<WorkerContext> {
        Arc::new(WorkerContext {
            client: Client::new(),
            registry: Arc::new(registry),
            store,
            stats: Arc::new(CrawlStats::new()),
            limits: Limits::default(),
            temp_root: std::env::temp_dir().join("symdex-worker-tests"),
            cancel: CancellationToken::new(),
        })
    }

    fn fast_rate() -> RateLimit {
        RateLimit {
            interval: Duration::from_millis(1),
            burst: 10,
        }
    }

    #[tokio::test]
    async fn pipeline_persists_symbols() {
        let mut archives = std::collections::HashMap::new();
        archives.insert("example.com/a".to_string(), zip_with(&["Alpha", "Beta"]));
        let registry = CannedRegistry {
            archives,
            extractor: LineExtractor,
        };
        let store = Arc::new(MemoryStore::new());
        let ctx = context(registry, Arc::clone(&store));

        let (tx, rx) = mpsc::channel(10);
        let pool = WorkerPool::spawn(2, fast_rate(), rx, Arc::clone(&ctx));

        tx.send(record("example.com/a")).await.unwrap();
        drop(tx);
        pool.join().await;

        let snapshot = ctx.stats.snapshot();
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.symbols_indexed, 2);

        let symbols = store.symbols_for("example.com/a").unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "Alpha");
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let mut archives = std::collections::HashMap::new();
        archives.insert("example.com/a".to_string(), zip_with(&["A"]));
        // example.com/broken has no archive -> download error
        archives.insert("example.com/c".to_string(), zip_with(&["C"]));
        let registry = CannedRegistry {
            archives,
            extractor: LineExtractor,
        };
        let store = Arc::new(MemoryStore::new());
        let ctx = context(registry, Arc::clone(&store));

        let (tx, rx) = mpsc::channel(10);
        let pool = WorkerPool::spawn(2, fast_rate(), rx, Arc::clone(&ctx));

        for path in ["example.com/a", "example.com/broken", "example.com/c"] {
            tx.send(record(path)).await.unwrap();
        }
        drop(tx);
        pool.join().await;

        let snapshot = ctx.stats.snapshot();
        assert_eq!(snapshot.processed, 3);
        assert_eq!(snapshot.succeeded, 2);
        assert_eq!(snapshot.failed, 1);
    }

    #[tokio::test]
    async fn recrawl_replaces_symbols() {
        let mut archives = std::collections::HashMap::new();
        archives.insert("example.com/a".to_string(), zip_with(&["Old", "Stale"]));
        let registry = CannedRegistry {
            archives,
            extractor: LineExtractor,
        };
        let store = Arc::new(MemoryStore::new());

        {
            let ctx = context(registry, Arc::clone(&store));
            let (tx, rx) = mpsc::channel(10);
            let pool = WorkerPool::spawn(1, fast_rate(), rx, ctx);
            tx.send(record("example.com/a")).await.unwrap();
            drop(tx);
            pool.join().await;
        }
        assert_eq!(store.symbols_for("example.com/a").unwrap().len(), 2);

        // Second crawl of the same unit with different content
        let mut archives = std::collections::HashMap::new();
        archives.insert("example.com/a".to_string(), zip_with(&["New"]));
        let registry = CannedRegistry {
            archives,
            extractor: LineExtractor,
        };
        {
            let ctx = context(registry, Arc::clone(&store));
            let (tx, rx) = mpsc::channel(10);
            let pool = WorkerPool::spawn(1, fast_rate(), rx, ctx);
            tx.send(record("example.com/a")).await.unwrap();
            drop(tx);
            pool.join().await;
        }

        let symbols = store.symbols_for("example.com/a").unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "New");
    }

    #[tokio::test]
    async fn cancellation_stops_idle_workers() {
        let registry = CannedRegistry {
            archives: std::collections::HashMap::new(),
            extractor: LineExtractor,
        };
        let store = Arc::new(MemoryStore::new());
        let ctx = context(registry, store);

        let (_tx, rx) = mpsc::channel::<VersionRecord>(10);
        let pool = WorkerPool::spawn(2, fast_rate(), rx, Arc::clone(&ctx));

        // No jobs are ever sent; cancellation alone must unblock the pool
        ctx.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), pool.join())
            .await
            .expect("pool did not exit after cancellation");
    }
}
