//! Crawler module for package discovery and processing
//!
//! This module contains the core crawling machinery:
//! - Discovery of published versions from the registry index
//! - The bounded worker pool and its per-job pipeline
//! - Per-worker token-bucket rate limiting
//! - Run orchestration, one-shot and scheduled

mod discovery;
mod limiter;
mod orchestrator;
mod worker;

pub use discovery::run_discovery;
pub use limiter::TokenBucket;
pub use orchestrator::Orchestrator;
pub use worker::{RateLimit, WorkerContext, WorkerPool};

use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client shared by discovery and the workers
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let user_agent = format!("symdex/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
