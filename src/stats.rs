//! Crawl statistics aggregation
//!
//! Counters are mutated by any worker under a single mutex and summarized
//! once the pool has joined. Throughput is derived at reporting time, never
//! stored.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    processed: u64,
    succeeded: u64,
    failed: u64,
    symbols_indexed: u64,
}

/// Thread-safe crawl counters
#[derive(Debug)]
pub struct CrawlStats {
    counters: Mutex<Counters>,
    start_time: Instant,
}

/// A consistent copy of the counters, taken under one lock acquisition
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub symbols_indexed: u64,
    pub elapsed: Duration,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    /// Records one successfully crawled unit and its symbol count
    pub fn record_success(&self, symbols: u64) {
        let mut counters = self.counters.lock().unwrap();
        counters.processed += 1;
        counters.succeeded += 1;
        counters.symbols_indexed += symbols;
    }

    /// Records one failed unit
    pub fn record_failure(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.processed += 1;
        counters.failed += 1;
    }

    /// Returns a consistent copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = *self.counters.lock().unwrap();
        StatsSnapshot {
            processed: counters.processed,
            succeeded: counters.succeeded,
            failed: counters.failed,
            symbols_indexed: counters.symbols_indexed,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSnapshot {
    /// Units processed per second, derived from the elapsed clock
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nCrawl Summary")?;
        writeln!(f, "-------------")?;
        writeln!(f, "  duration : {:?}", self.elapsed)?;
        writeln!(
            f,
            "  modules  : processed: {}, succeeded: {}, failed: {}",
            self.processed, self.succeeded, self.failed
        )?;
        writeln!(f, "  symbols  : {}", self.symbols_indexed)?;
        writeln!(f, "  rate     : {:.2} modules/sec", self.rate())
    }
}
