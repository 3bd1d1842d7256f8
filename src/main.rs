//! Symdex main entry point
//!
//! This is the command-line interface for the symdex package-symbol crawler.

use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use symdex::config::load_config_with_hash;
use symdex::storage::MemoryStore;
use symdex::symbols::{Symbol, SymbolExtractor};
use symdex::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Symdex: a package-ecosystem symbol crawler
///
/// Symdex walks a registry changelog, downloads and safely extracts each
/// published version, indexes its symbols, and persists the result.
#[derive(Parser, Debug)]
#[command(name = "symdex")]
#[command(version)]
#[command(about = "A package-ecosystem symbol crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single crawl and exit (default)
    #[arg(long, conflicts_with = "watch")]
    once: bool,

    /// Keep running incremental crawls on the configured interval
    #[arg(long, conflicts_with = "once")]
    watch: bool,

    /// Crawl only records published after this RFC3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    since: Option<DateTime<Utc>>,

    /// Override the configured worker count
    #[arg(long)]
    workers: Option<usize>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["once", "watch"])]
    dry_run: bool,
}

/// Extractor placeholder wired until a language backend is plugged in
///
/// The crawler consumes extractors as black boxes behind the
/// [`SymbolExtractor`] trait; the binary ships with a no-op one so the
/// pipeline can be exercised end to end without a language backend.
struct NoopExtractor;

impl SymbolExtractor for NoopExtractor {
    fn parse_file(&self, _path: &std::path::Path) -> std::io::Result<Vec<Symbol>> {
        Ok(vec![])
    }

    fn matches(&self, _path: &std::path::Path) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers.max(1);
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    // Wire the collaborators. Library consumers plug their own store and
    // extractor; the binary defaults to the in-memory store and a no-op
    // extractor.
    let store = Arc::new(MemoryStore::new());
    let registry = symdex::registry::from_config(&config.registry, Box::new(NoopExtractor))?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping crawl");
            ctrl_c_cancel.cancel();
        }
    });

    let interval = Duration::from_secs(config.crawler.schedule_interval_secs);
    let orchestrator = Orchestrator::new(config, registry, store, cancel)?;

    if cli.watch {
        orchestrator.run_with_schedule(interval).await?;
    } else {
        let since = match cli.since {
            Some(since) => Some(since),
            None => orchestrator.store().get_last_crawl_time()?,
        };
        orchestrator.run(since).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("symdex=info,warn"),
            1 => EnvFilter::new("symdex=debug,info"),
            2 => EnvFilter::new("symdex=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &symdex::config::Config) {
    println!("=== Symdex Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!(
        "  Rate limit: {} tokens / {}ms refill",
        config.crawler.rate_limit_burst, config.crawler.rate_limit_interval_ms
    );
    if config.crawler.max_modules > 0 {
        println!("  Max modules per run: {}", config.crawler.max_modules);
    } else {
        println!("  Max modules per run: unlimited");
    }
    println!(
        "  Schedule interval: {}s",
        config.crawler.schedule_interval_secs
    );

    println!("\nRegistry:");
    println!("  Kind: {}", config.registry.kind);
    println!("  Index: {}", config.registry.index_url);
    println!("  Downloads: {}", config.registry.download_url);
    println!("  Allow internal: {}", config.registry.allow_internal);
    if !config.registry.skip_paths.is_empty() {
        println!("  Skip paths ({}):", config.registry.skip_paths.len());
        for pattern in &config.registry.skip_paths {
            println!("    - {}", pattern);
        }
    }

    println!("\nArchive caps:");
    println!("  Per-entry: {} bytes", config.archive.max_entry_bytes);
    println!("  Total: {} bytes", config.archive.max_total_bytes);

    println!("\nOutput:");
    println!("  Temp root: {}", config.output.temp_root);

    println!("\n✓ Configuration is valid");
}
