//! Crawl orchestration
//!
//! Wires discovery into the worker pool over one bounded queue, aggregates
//! stats, and supports both one-shot and scheduled incremental execution.

use crate::archive::Limits;
use crate::config::Config;
use crate::crawler::build_http_client;
use crate::crawler::discovery::run_discovery;
use crate::crawler::worker::{RateLimit, WorkerContext, WorkerPool};
use crate::registry::Registry;
use crate::stats::{CrawlStats, StatsSnapshot};
use crate::storage::PackageStore;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drives crawl runs against one registry and one store
pub struct Orchestrator {
    config: Arc<Config>,
    registry: Arc<dyn Registry>,
    store: Arc<dyn PackageStore>,
    client: Client,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates a new orchestrator
    ///
    /// The cancellation token is shared with the caller; cancelling it stops
    /// discovery and the workers at their next suspension point.
    pub fn new(
        config: Config,
        registry: Arc<dyn Registry>,
        store: Arc<dyn PackageStore>,
        cancel: CancellationToken,
    ) -> crate::Result<Self> {
        let client = build_http_client()?;
        Ok(Self {
            config: Arc::new(config),
            registry,
            store,
            client,
            cancel,
        })
    }

    /// Runs one crawl over everything newer than `since`
    ///
    /// Per-job failures are counted, never returned. The watermark advances
    /// only when the run completes without cancellation; a cancelled run
    /// keeps the previous watermark so the next incremental run re-covers
    /// the gap, and returns [`CrawlError::Cancelled`] after logging the
    /// summary.
    pub async fn run(&self, since: Option<DateTime<Utc>>) -> crate::Result<StatsSnapshot> {
        match since {
            Some(since) => tracing::info!(
                "Starting {} crawl of records since {}",
                self.registry.name(),
                since
            ),
            None => tracing::info!("Starting full {} crawl", self.registry.name()),
        }

        let stats = Arc::new(CrawlStats::new());
        let (tx, rx) = mpsc::channel(self.config.crawler.queue_capacity);

        let ctx = Arc::new(WorkerContext {
            client: self.client.clone(),
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            stats: Arc::clone(&stats),
            limits: Limits {
                max_entry_bytes: self.config.archive.max_entry_bytes,
                max_total_bytes: self.config.archive.max_total_bytes,
            },
            temp_root: PathBuf::from(&self.config.output.temp_root),
            cancel: self.cancel.clone(),
        });
        let rate = RateLimit {
            interval: Duration::from_millis(self.config.crawler.rate_limit_interval_ms),
            burst: self.config.crawler.rate_limit_burst,
        };

        let pool = WorkerPool::spawn(self.config.crawler.workers, rate, rx, ctx);

        // Discovery runs on this task; dropping the sender when it returns
        // closes the queue and lets the workers drain out.
        let discovered = run_discovery(
            &self.client,
            self.registry.as_ref(),
            since,
            self.config.crawler.max_modules,
            tx,
            &self.cancel,
        )
        .await;

        pool.join().await;

        let snapshot = stats.snapshot();
        tracing::info!("{}", snapshot);

        let discovered = discovered?;
        if self.cancel.is_cancelled() {
            tracing::info!("Run cancelled; keeping previous crawl watermark");
            return Err(CrawlError::Cancelled);
        }

        tracing::debug!("Discovered {} records this run", discovered);
        self.store.set_last_crawl_time(Utc::now())?;
        Ok(snapshot)
    }

    /// Runs incremental crawls on a fixed interval until cancelled
    ///
    /// The first run starts immediately using the persisted watermark (a
    /// missing watermark means a full crawl). Cancellation is a clean stop;
    /// fatal run errors are logged and the schedule keeps going.
    pub async fn run_with_schedule(&self, interval: Duration) -> crate::Result<()> {
        loop {
            let since = self.store.get_last_crawl_time()?;
            match self.run(since).await {
                Ok(_) => {}
                Err(CrawlError::Cancelled) => return Ok(()),
                Err(e) => tracing::error!("Scheduled run failed: {}", e),
            }

            tracing::info!("Next crawl in {:?}", interval);
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// The store this orchestrator persists into
    pub fn store(&self) -> &Arc<dyn PackageStore> {
        &self.store
    }
}
