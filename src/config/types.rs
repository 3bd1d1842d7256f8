use serde::Deserialize;

/// Main configuration structure for symdex
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Bounded queue capacity between discovery and the pool
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Token refill interval per worker (milliseconds)
    #[serde(rename = "rate-limit-interval-ms")]
    pub rate_limit_interval_ms: u64,

    /// Token bucket capacity per worker
    #[serde(rename = "rate-limit-burst")]
    pub rate_limit_burst: u32,

    /// Maximum modules per run; 0 means unlimited
    #[serde(rename = "max-modules", default)]
    pub max_modules: u64,

    /// Delay between scheduled incremental runs (seconds)
    #[serde(rename = "schedule-interval-secs", default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,
}

/// Registry selection and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Ecosystem kind: "go", "crates", or "npm"
    pub kind: String,

    /// Changelog index endpoint
    #[serde(rename = "index-url")]
    pub index_url: String,

    /// Archive/metadata endpoint base
    #[serde(rename = "download-url")]
    pub download_url: String,

    /// Crawl internal packages when set
    #[serde(rename = "allow-internal", default)]
    pub allow_internal: bool,

    /// Module-path substrings that are never crawled
    #[serde(rename = "skip-paths", default)]
    pub skip_paths: Vec<String>,
}

/// Extraction size caps
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Per-file cap in bytes; larger entries are skipped
    #[serde(rename = "max-entry-bytes", default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,

    /// Global cap in bytes; exceeding it aborts the extraction
    #[serde(rename = "max-total-bytes", default = "default_max_total_bytes")]
    pub max_total_bytes: u64,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for per-job temp directories
    #[serde(rename = "temp-root", default = "default_temp_root")]
    pub temp_root: String,
}

fn default_queue_capacity() -> usize {
    100
}

fn default_schedule_interval() -> u64 {
    3600
}

fn default_max_entry_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_max_total_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_temp_root() -> String {
    std::env::temp_dir().join("symdex").display().to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: default_max_entry_bytes(),
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
        }
    }
}
