use crate::config::types::{ArchiveConfig, Config, CrawlerConfig, RegistryConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_registry_config(&config.registry)?;
    validate_archive_config(&config.archive)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue-capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.rate_limit_interval_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit-interval-ms must be >= 1, got {}",
            config.rate_limit_interval_ms
        )));
    }

    if config.rate_limit_burst < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit-burst must be >= 1, got {}",
            config.rate_limit_burst
        )));
    }

    if config.schedule_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "schedule-interval-secs must be >= 1, got {}",
            config.schedule_interval_secs
        )));
    }

    Ok(())
}

/// Validates registry configuration
fn validate_registry_config(config: &RegistryConfig) -> Result<(), ConfigError> {
    match config.kind.as_str() {
        "go" | "crates" | "npm" => {}
        other => return Err(ConfigError::UnknownRegistry(other.to_string())),
    }

    if config.index_url.is_empty() {
        return Err(ConfigError::Validation(
            "index-url cannot be empty".to_string(),
        ));
    }
    Url::parse(&config.index_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid index-url: {}", e)))?;

    if config.download_url.is_empty() {
        return Err(ConfigError::Validation(
            "download-url cannot be empty".to_string(),
        ));
    }
    Url::parse(&config.download_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid download-url: {}", e)))?;

    Ok(())
}

/// Validates archive caps
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    if config.max_entry_bytes < 1 || config.max_total_bytes < 1 {
        return Err(ConfigError::Validation(
            "archive caps must be >= 1 byte".to_string(),
        ));
    }

    if config.max_entry_bytes > config.max_total_bytes {
        return Err(ConfigError::Validation(format!(
            "max-entry-bytes ({}) cannot exceed max-total-bytes ({})",
            config.max_entry_bytes, config.max_total_bytes
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::OutputConfig;

    fn valid_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                workers: 4,
                queue_capacity: 100,
                rate_limit_interval_ms: 250,
                rate_limit_burst: 5,
                max_modules: 0,
                schedule_interval_secs: 3600,
            },
            registry: RegistryConfig {
                kind: "go".to_string(),
                index_url: "https://index.example.test/index".to_string(),
                download_url: "https://proxy.example.test".to_string(),
                allow_internal: false,
                skip_paths: vec![],
            },
            archive: ArchiveConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let mut config = valid_config();
        config.crawler.workers = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_burst_rejected() {
        let mut config = valid_config();
        config.crawler.rate_limit_burst = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_registry_rejected() {
        let mut config = valid_config();
        config.registry.kind = "maven".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnknownRegistry(_))
        ));
    }

    #[test]
    fn malformed_index_url_rejected() {
        let mut config = valid_config();
        config.registry.index_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn entry_cap_above_total_cap_rejected() {
        let mut config = valid_config();
        config.archive.max_entry_bytes = 100;
        config.archive.max_total_bytes = 50;
        assert!(validate(&config).is_err());
    }
}
