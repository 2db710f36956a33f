use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Network timeout and batch concurrency are not 0
/// - Download directory is set
/// - Bookstore URLs are http(s)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.network.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "network.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.network.max_concurrent_requests == 0 {
        return Err(ConfigError::ValidationError(
            "network.max_concurrent_requests cannot be 0".to_string(),
        ));
    }

    if config.library.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "library.download_dir cannot be empty".to_string(),
        ));
    }

    if let Some(bookstore) = &config.bookstore {
        if bookstore.site_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bookstore.site_name cannot be empty".to_string(),
            ));
        }
        for (key, url) in [
            ("bookstore.catalog_url", &bookstore.catalog_url),
            ("bookstore.secure_url", &bookstore.secure_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an http(s) URL, got {:?}",
                    key, url
                )));
            }
        }
    }

    Ok(())
}
