//! Discovery of published versions from the registry index
//!
//! Streams the line-delimited changelog, decodes each line into a
//! [`VersionRecord`], applies the registry's skip rules, and pushes
//! survivors into the bounded job queue. Skipped and malformed records never
//! reach the queue and therefore never touch the stats.

use crate::registry::{Registry, VersionRecord};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outcome of a single changelog line
enum LineOutcome {
    Enqueued,
    Skipped,
    QueueClosed,
}

/// Streams the changelog into the job queue
///
/// Returns the number of records enqueued. A non-success status or a
/// transport error on the initial request is fatal; transport errors
/// mid-stream end the stream with whatever was already enqueued.
/// Cancellation stops reading and drops the sender so workers drain.
pub async fn run_discovery(
    client: &Client,
    registry: &dyn Registry,
    since: Option<DateTime<Utc>>,
    max_modules: u64,
    queue: mpsc::Sender<VersionRecord>,
    cancel: &CancellationToken,
) -> crate::Result<u64> {
    let url = registry.changelog_url(since);
    tracing::info!("Fetching index from {}", url);

    let mut response = client
        .get(&url)
        .send()
        .await
        .map_err(|source| CrawlError::Http {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CrawlError::IndexStatus {
            url,
            status: status.as_u16(),
        });
    }

    let mut enqueued = 0u64;
    // Byte buffer so multi-byte sequences split across chunks stay intact;
    // '\n' is never part of a longer UTF-8 sequence.
    let mut buffer: Vec<u8> = Vec::new();

    'stream: loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Discovery cancelled after {} records", enqueued);
                break 'stream;
            }
            chunk = response.chunk() => match chunk {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break 'stream,
                Err(e) => {
                    tracing::warn!("Index stream ended early: {}", e);
                    break 'stream;
                }
            },
        };

        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            match handle_line(line.trim(), registry, &queue, cancel).await {
                LineOutcome::Enqueued => {
                    enqueued += 1;
                    if max_modules > 0 && enqueued >= max_modules {
                        tracing::info!("Reached max-modules limit of {}", max_modules);
                        break 'stream;
                    }
                }
                LineOutcome::Skipped => {}
                LineOutcome::QueueClosed => break 'stream,
            }
        }
    }

    // The body may end without a trailing newline
    let under_limit = max_modules == 0 || enqueued < max_modules;
    if under_limit && !cancel.is_cancelled() && !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        if matches!(
            handle_line(line.trim(), registry, &queue, cancel).await,
            LineOutcome::Enqueued
        ) {
            enqueued += 1;
        }
    }

    tracing::info!("Discovery finished with {} records enqueued", enqueued);
    Ok(enqueued)
}

async fn handle_line(
    line: &str,
    registry: &dyn Registry,
    queue: &mpsc::Sender<VersionRecord>,
    cancel: &CancellationToken,
) -> LineOutcome {
    if line.is_empty() {
        return LineOutcome::Skipped;
    }

    let record: VersionRecord = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Skipping malformed index line: {}", e);
            return LineOutcome::Skipped;
        }
    };

    if registry.should_skip(&record.path) {
        tracing::debug!("Skipping {} per skip rules", record.path);
        return LineOutcome::Skipped;
    }

    tokio::select! {
        _ = cancel.cancelled() => LineOutcome::QueueClosed,
        sent = queue.send(record) => match sent {
            Ok(()) => LineOutcome::Enqueued,
            Err(_) => LineOutcome::QueueClosed,
        },
    }
}
