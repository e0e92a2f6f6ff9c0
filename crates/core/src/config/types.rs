use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{FixtureConfig, TmdbConfig, MAX_PAGE};
use crate::favourites::RestFavouritesConfig;
use crate::search::{FuzzyOptions, DEFAULT_DISTANCE, DEFAULT_THRESHOLD};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Catalog configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Catalog backend type
    pub backend: CatalogBackend,
    /// TMDB-specific configuration (required when backend = "tmdb")
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    /// JSON fixture (required when backend = "fixture")
    #[serde(default)]
    pub fixture: Option<FixtureConfig>,
}

/// Available catalog backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    Tmdb,
    /// Items read from a local JSON file.
    Fixture,
}

impl CatalogBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogBackend::Tmdb => "tmdb",
            CatalogBackend::Fixture => "fixture",
        }
    }
}

/// Page aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
    /// Seconds a cached collection stays fresh (default: 300)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Remote pages fetched when a request names none (default: 5)
    #[serde(default = "default_pages")]
    pub default_pages: u32,
    /// Most remote pages one query may fan out to (default: 20)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Most collections kept in the cache (default: 64)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            default_pages: default_pages(),
            max_pages: default_max_pages(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AggregatorConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_pages() -> u32 {
    5
}

fn default_max_pages() -> u32 {
    20.min(MAX_PAGE)
}

fn default_cache_capacity() -> usize {
    64
}

/// Fuzzy title search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Acceptance threshold in (0, 1] (default: 0.5)
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Location scale in characters, 0 disables (default: 100)
    #[serde(default = "default_distance")]
    pub distance: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            distance: default_distance(),
        }
    }
}

impl SearchConfig {
    pub fn fuzzy_options(&self) -> FuzzyOptions {
        FuzzyOptions {
            threshold: self.threshold,
            distance: self.distance,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_distance() -> usize {
    DEFAULT_DISTANCE
}

/// Pagination configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    crate::pipeline::DEFAULT_PAGE_SIZE
}

/// Favourites persistence configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    /// REST configuration (required when backend = "rest")
    #[serde(default)]
    pub rest: Option<RestFavouritesConfig>,
}

/// Available persistence backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    #[default]
    Sqlite,
    Rest,
}

impl PersistenceBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceBackend::Sqlite => "sqlite",
            PersistenceBackend::Rest => "rest",
        }
    }
}

/// SQLite favourites database
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("filmdeck.db")
}

/// Identity configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Sign this user in at startup.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub catalog: SanitizedCatalogConfig,
    pub aggregator: AggregatorConfig,
    pub search: SearchConfig,
    pub pagination: PaginationConfig,
    pub persistence: SanitizedPersistenceConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<SanitizedTmdbConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<FixtureConfig>,
}

/// Sanitized TMDB config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTmdbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPersistenceConfig {
    pub backend: String,
    pub sqlite: SqliteConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<SanitizedRestConfig>,
}

/// Sanitized REST persistence config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRestConfig {
    pub url: String,
    pub table: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            catalog: SanitizedCatalogConfig {
                backend: config.catalog.backend.as_str().to_string(),
                tmdb: config.catalog.tmdb.as_ref().map(|t| SanitizedTmdbConfig {
                    base_url: t.base_url.clone(),
                    language: t.language.clone(),
                    api_key_configured: !t.api_key.is_empty(),
                    timeout_secs: t.timeout_secs,
                }),
                fixture: config.catalog.fixture.clone(),
            },
            aggregator: config.aggregator.clone(),
            search: config.search.clone(),
            pagination: config.pagination.clone(),
            persistence: SanitizedPersistenceConfig {
                backend: config.persistence.backend.as_str().to_string(),
                sqlite: config.persistence.sqlite.clone(),
                rest: config.persistence.rest.as_ref().map(|r| SanitizedRestConfig {
                    url: r.url.clone(),
                    table: r.table.clone(),
                    api_key_configured: !r.api_key.is_empty(),
                }),
            },
            identity: config.identity.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[catalog]
backend = "fixture"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog.backend, CatalogBackend::Fixture);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.aggregator.cache_ttl_secs, 300);
        assert_eq!(config.aggregator.default_pages, 5);
        assert_eq!(config.aggregator.max_pages, 20);
        assert_eq!(config.aggregator.cache_capacity, 64);
        assert_eq!(config.search.threshold, 0.5);
        assert_eq!(config.search.distance, 100);
        assert_eq!(config.pagination.page_size, 20);
        assert_eq!(config.persistence.backend, PersistenceBackend::Sqlite);
        assert_eq!(
            config.persistence.sqlite.path.to_str().unwrap(),
            "filmdeck.db"
        );
        assert!(config.identity.user_id.is_none());
    }

    #[test]
    fn test_deserialize_missing_catalog_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[catalog]
backend = "tmdb"

[catalog.tmdb]
api_key = "tmdb-key"
language = "it-IT"

[aggregator]
cache_ttl_secs = 60
default_pages = 3
max_pages = 10
cache_capacity = 8

[search]
threshold = 0.4
distance = 0

[pagination]
page_size = 8

[persistence]
backend = "rest"

[persistence.rest]
url = "https://example.supabase.co/rest/v1"
api_key = "anon"

[identity]
user_id = "alice"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let tmdb = config.catalog.tmdb.as_ref().unwrap();
        assert_eq!(tmdb.api_key, "tmdb-key");
        assert_eq!(tmdb.language.as_deref(), Some("it-IT"));
        assert_eq!(tmdb.timeout_secs, 30);
        assert_eq!(config.aggregator.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.aggregator.max_pages, 10);
        assert_eq!(config.aggregator.cache_capacity, 8);
        assert_eq!(config.search.fuzzy_options().distance, 0);
        assert_eq!(config.pagination.page_size, 8);

        let rest = config.persistence.rest.as_ref().unwrap();
        assert_eq!(rest.table, "favourites");
        assert_eq!(config.identity.user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_sanitized_config_hides_keys() {
        let toml = r#"
[catalog]
backend = "tmdb"

[catalog.tmdb]
api_key = "secret-key"

[persistence]
backend = "rest"

[persistence.rest]
url = "https://example.supabase.co/rest/v1"
api_key = "also-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert_eq!(sanitized.catalog.backend, "tmdb");
        assert!(sanitized.catalog.tmdb.as_ref().unwrap().api_key_configured);
        assert!(sanitized.persistence.rest.as_ref().unwrap().api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
        assert!(!json.contains("also-secret"));
    }
}
