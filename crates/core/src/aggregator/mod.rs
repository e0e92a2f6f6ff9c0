//! Page aggregation.
//!
//! Fans out one catalog request per page, joins on all of them, and merges
//! the results into a single deduplicated [`Collection`]. Aggregated
//! collections are cached per [`QueryKey`] and served stale-while-revalidate.

mod cache;

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, CatalogProvider, QueryKey};
use crate::config::AggregatorConfig;
use crate::media::{Collection, Genre, MediaItem, MediaType};
use crate::metrics::{AGGREGATED_ITEMS, AGGREGATOR_CACHE, AGGREGATOR_REFRESHES};

use cache::{CollectionCache, Lookup};

/// Default cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default cap on the pages one query may fan out to.
pub const DEFAULT_MAX_PAGES: usize = 20;

/// Default number of cached collections.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// A catalog fetch failed. Terminal for the requesting operation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The query asks for more pages than one fan-out may issue.
    #[error("Query {key} asks for {requested} pages, at most {max} are allowed")]
    TooManyPages {
        key: QueryKey,
        requested: usize,
        max: usize,
    },

    /// One or more pages of an aggregated query failed.
    #[error(
        "Failed to fetch {key}: page {page} failed ({failed} of {requested} pages failed): {source}"
    )]
    Pages {
        key: QueryKey,
        /// First failing page, in page order.
        page: u32,
        failed: usize,
        requested: usize,
        #[source]
        source: CatalogError,
    },

    /// One or more item details of a batch failed.
    #[error(
        "Failed to fetch {media_type} {id} ({failed} of {requested} details failed): {source}"
    )]
    Details {
        media_type: MediaType,
        /// First failing id, in request order.
        id: u32,
        failed: usize,
        requested: usize,
        #[source]
        source: CatalogError,
    },

    /// A single-item or genre request failed.
    #[error("Failed to fetch {what}: {source}")]
    Request {
        what: String,
        #[source]
        source: CatalogError,
    },
}

impl FetchError {
    /// Status code of the underlying catalog error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::TooManyPages { .. } => None,
            FetchError::Pages { source, .. }
            | FetchError::Details { source, .. }
            | FetchError::Request { source, .. } => source.status_code(),
        }
    }

    /// True when the query was refused before reaching the catalog.
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, FetchError::TooManyPages { .. })
    }

    /// True when the catalog reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::Request {
                source: CatalogError::NotFound(_),
                ..
            }
        )
    }
}

struct Inner {
    provider: Arc<dyn CatalogProvider>,
    cache: RwLock<CollectionCache>,
    max_pages: usize,
}

/// Merges remote catalog pages into cached, deduplicated collections.
///
/// Cheaply cloneable; clones share the cache.
#[derive(Clone)]
pub struct PageAggregator {
    inner: Arc<Inner>,
}

impl PageAggregator {
    /// Create an aggregator with the default cache TTL.
    pub fn new(provider: Arc<dyn CatalogProvider>) -> Self {
        Self::with_ttl(provider, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(provider: Arc<dyn CatalogProvider>, ttl: Duration) -> Self {
        Self::with_limits(provider, ttl, DEFAULT_MAX_PAGES, DEFAULT_CACHE_CAPACITY)
    }

    pub fn from_config(provider: Arc<dyn CatalogProvider>, config: &AggregatorConfig) -> Self {
        Self::with_limits(
            provider,
            config.cache_ttl(),
            config.max_pages as usize,
            config.cache_capacity,
        )
    }

    /// Create an aggregator that refuses queries over `max_pages` pages and
    /// caches at most `cache_capacity` collections.
    pub fn with_limits(
        provider: Arc<dyn CatalogProvider>,
        ttl: Duration,
        max_pages: usize,
        cache_capacity: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                cache: RwLock::new(CollectionCache::new(ttl, cache_capacity)),
                max_pages: max_pages.max(1),
            }),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.inner.max_pages
    }

    /// Refuse keys that would fan out to more than [`Self::max_pages`] pages.
    pub fn check(&self, key: &QueryKey) -> Result<(), FetchError> {
        let requested = key.pages.len();
        if requested > self.inner.max_pages {
            return Err(FetchError::TooManyPages {
                key: key.clone(),
                requested,
                max: self.inner.max_pages,
            });
        }
        Ok(())
    }

    /// Return the collection for `key`.
    ///
    /// A fresh cached collection is returned as-is. An expired one is also
    /// returned immediately, and a single background refresh is started. On a
    /// miss every page is fetched concurrently; if any page fails the error is
    /// reported only after all pages have settled.
    pub async fn fetch(&self, key: &QueryKey) -> Result<Arc<Collection>, FetchError> {
        self.check(key)?;
        let lookup = self.inner.cache.write().await.lookup(key);

        match lookup {
            Lookup::Fresh(collection) => {
                AGGREGATOR_CACHE.with_label_values(&["fresh"]).inc();
                debug!("Aggregator cache hit: key={}", key);
                Ok(collection)
            }
            Lookup::Stale {
                collection,
                refresh,
            } => {
                AGGREGATOR_CACHE.with_label_values(&["stale"]).inc();
                if refresh {
                    debug!("Aggregator cache stale, refreshing in background: key={}", key);
                    let inner = Arc::clone(&self.inner);
                    let key = key.clone();
                    tokio::spawn(async move { inner.refresh(key).await });
                }
                Ok(collection)
            }
            Lookup::Miss => {
                AGGREGATOR_CACHE.with_label_values(&["miss"]).inc();
                let collection = Arc::new(self.inner.fetch_pages(key).await?);
                self.inner.store(key.clone(), Arc::clone(&collection)).await;
                Ok(collection)
            }
        }
    }

    /// Fetch the full record of one item. Not cached.
    pub async fn detail(&self, media_type: MediaType, id: u32) -> Result<MediaItem, FetchError> {
        self.inner
            .provider
            .detail(media_type, id)
            .await
            .map_err(|source| FetchError::Request {
                what: format!("{} {}", media_type, id),
                source,
            })
    }

    /// Fetch the full records of `ids` concurrently, in `ids` order.
    ///
    /// Ids the catalog no longer knows are skipped. Any other failure is
    /// reported once every request has settled.
    pub async fn details(
        &self,
        media_type: MediaType,
        ids: &[u32],
    ) -> Result<Collection, FetchError> {
        let requests = ids.iter().map(|&id| async move {
            (id, self.inner.provider.detail(media_type, id).await)
        });
        let results = join_all(requests).await;

        let mut collection = Collection::new();
        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(item) => {
                    collection.push(item);
                }
                Err(CatalogError::NotFound(_)) => {
                    warn!("Skipping {} {}: no longer in the catalog", media_type, id);
                }
                Err(e) => {
                    warn!("Catalog detail failed: {} {}: {}", media_type, id, e);
                    failures.push((id, e));
                }
            }
        }

        let failed = failures.len();
        if let Some((id, source)) = failures.into_iter().next() {
            return Err(FetchError::Details {
                media_type,
                id,
                failed,
                requested: ids.len(),
                source,
            });
        }

        debug!(
            "Fetched {} of {} {} details",
            collection.len(),
            ids.len(),
            media_type
        );
        Ok(collection)
    }

    /// Fetch the genre list for a media type. Not cached.
    pub async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, FetchError> {
        self.inner
            .provider
            .genres(media_type)
            .await
            .map_err(|source| FetchError::Request {
                what: format!("{} genres", media_type),
                source,
            })
    }

    /// Drop the cached collection for `key`. Returns true if one was cached.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        self.inner.cache.write().await.remove(key)
    }

    pub async fn clear(&self) {
        self.inner.cache.write().await.clear();
    }

    pub async fn cached_queries(&self) -> usize {
        self.inner.cache.read().await.len()
    }
}

impl Inner {
    async fn store(&self, key: QueryKey, collection: Arc<Collection>) {
        if let Some(evicted) = self.cache.write().await.insert(key, collection) {
            AGGREGATOR_CACHE.with_label_values(&["evicted"]).inc();
            debug!("Aggregator cache full, evicted: key={}", evicted);
        }
    }

    async fn fetch_pages(&self, key: &QueryKey) -> Result<Collection, FetchError> {
        let pages = key.pages.pages();
        if pages.is_empty() {
            return Ok(Collection::new());
        }

        debug!(
            "Fetching {} pages from {}: key={}",
            pages.len(),
            self.provider.name(),
            key
        );

        let requests = pages.iter().map(|&page| async move {
            let result = self.provider.page(key.media_type, key.listing, page).await;
            (page, result)
        });

        // join_all preserves request order, so pages merge in page order
        let results = join_all(requests).await;

        let mut merged = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (page, result) in results {
            match result {
                Ok(catalog_page) => merged.push(catalog_page.items),
                Err(e) => {
                    warn!("Catalog page failed: key={}, page={}: {}", key, page, e);
                    failures.push((page, e));
                }
            }
        }

        let failed = failures.len();
        if let Some((page, source)) = failures.into_iter().next() {
            return Err(FetchError::Pages {
                key: key.clone(),
                page,
                failed,
                requested: pages.len(),
                source,
            });
        }

        let collection = Collection::from_pages(merged);
        AGGREGATED_ITEMS
            .with_label_values(&[key.media_type.as_str()])
            .observe(collection.len() as f64);
        info!(
            "Aggregated {} unique items for {}",
            collection.len(),
            key
        );

        Ok(collection)
    }

    async fn refresh(&self, key: QueryKey) {
        match self.fetch_pages(&key).await {
            Ok(collection) => {
                AGGREGATOR_REFRESHES.with_label_values(&["ok"]).inc();
                self.store(key, Arc::new(collection)).await;
            }
            Err(e) => {
                AGGREGATOR_REFRESHES.with_label_values(&["error"]).inc();
                warn!("Background refresh failed, keeping stale data: {}", e);
                self.cache.write().await.refresh_failed(&key);
            }
        }
    }
}
