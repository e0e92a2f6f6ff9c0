use super::{
    types::{CatalogBackend, Config, PersistenceBackend},
    ConfigError,
};
use crate::catalog::MAX_PAGE;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - The selected catalog and persistence backends have their sections
/// - Search threshold is in (0, 1]
/// - Page size and default page count are positive
/// - default_pages <= max_pages <= 500, and the cache holds at least one entry
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Catalog validation
    if config.catalog.backend == CatalogBackend::Tmdb {
        match &config.catalog.tmdb {
            None => {
                return Err(ConfigError::ValidationError(
                    "catalog.tmdb section is required when backend = \"tmdb\"".to_string(),
                ))
            }
            Some(tmdb) if tmdb.api_key.trim().is_empty() => {
                return Err(ConfigError::ValidationError(
                    "catalog.tmdb.api_key cannot be empty".to_string(),
                ))
            }
            Some(_) => {}
        }
    }

    if config.catalog.backend == CatalogBackend::Fixture && config.catalog.fixture.is_none() {
        return Err(ConfigError::ValidationError(
            "catalog.fixture section is required when backend = \"fixture\"".to_string(),
        ));
    }

    // Aggregator validation
    let aggregator = &config.aggregator;
    if aggregator.default_pages == 0 {
        return Err(ConfigError::ValidationError(
            "aggregator.default_pages cannot be 0".to_string(),
        ));
    }
    if aggregator.max_pages == 0 || aggregator.max_pages > MAX_PAGE {
        return Err(ConfigError::ValidationError(format!(
            "aggregator.max_pages must be in 1..={}, got {}",
            MAX_PAGE, aggregator.max_pages
        )));
    }
    if aggregator.default_pages > aggregator.max_pages {
        return Err(ConfigError::ValidationError(format!(
            "aggregator.default_pages ({}) exceeds aggregator.max_pages ({})",
            aggregator.default_pages, aggregator.max_pages
        )));
    }
    if aggregator.cache_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "aggregator.cache_capacity cannot be 0".to_string(),
        ));
    }

    // Search validation
    let threshold = config.search.threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "search.threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    if config.pagination.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "pagination.page_size cannot be 0".to_string(),
        ));
    }

    // Persistence validation
    if config.persistence.backend == PersistenceBackend::Rest && config.persistence.rest.is_none()
    {
        return Err(ConfigError::ValidationError(
            "persistence.rest section is required when backend = \"rest\"".to_string(),
        ));
    }

    Ok(())
}
