use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig, TargetEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates pagination settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_empty_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_empty_pages must be >= 1, got {}",
            config.max_empty_pages
        )));
    }

    Ok(())
}

/// Validates HTTP settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates crawl targets
fn validate_targets(targets: &[TargetEntry]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[target]] is required".to_string(),
        ));
    }

    for target in targets {
        let url = Url::parse(&target.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", target.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Target URL '{}' must use HTTP or HTTPS",
                target.url
            )));
        }

        if target.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "Target '{}' max_pages must be >= 1",
                target.url
            )));
        }
    }

    Ok(())
}
