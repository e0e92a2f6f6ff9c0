//! Mock catalog provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, CatalogPage, CatalogProvider, Listing};
use crate::media::{Genre, MediaItem, MediaType};

/// A recorded catalog request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCatalogRequest {
    Page {
        media_type: MediaType,
        listing: Listing,
        page: u32,
    },
    Detail {
        media_type: MediaType,
        id: u32,
    },
    Genres {
        media_type: MediaType,
    },
}

type PageKey = (MediaType, Listing, u32);

/// Mock implementation of the CatalogProvider trait.
///
/// Provides controllable behavior for testing:
/// - Serve configurable pages, details and genre lists
/// - Fail or delay individual page numbers
/// - Track requests for assertions
///
/// Unconfigured pages are served empty; unconfigured details are not found.
///
/// # Example
///
/// ```rust,ignore
/// use filmdeck_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.set_page(MediaType::Movie, Listing::Discover, 1, fixtures::movies(1..=20)).await;
/// catalog.fail_page(2).await;
/// ```
#[derive(Debug, Default)]
pub struct MockCatalog {
    pages: Arc<RwLock<HashMap<PageKey, Vec<MediaItem>>>>,
    details: Arc<RwLock<HashMap<(MediaType, u32), MediaItem>>>,
    genres: Arc<RwLock<HashMap<MediaType, Vec<Genre>>>>,
    /// Page numbers that fail for every media type and listing.
    failing_pages: Arc<RwLock<HashSet<u32>>>,
    /// Detail ids that fail with a 500 for every media type.
    failing_details: Arc<RwLock<HashSet<u32>>>,
    /// Artificial latency per page number.
    page_delays: Arc<RwLock<HashMap<u32, Duration>>>,
    requests: Arc<RwLock<Vec<RecordedCatalogRequest>>>,
    completed: Arc<RwLock<usize>>,
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Serve `items` for one page of a listing.
    pub async fn set_page(
        &self,
        media_type: MediaType,
        listing: Listing,
        page: u32,
        items: Vec<MediaItem>,
    ) {
        self.pages
            .write()
            .await
            .insert((media_type, listing, page), items);
    }

    /// Split `items` into consecutive pages of `page_size`, starting at page 1.
    pub async fn set_pages(
        &self,
        media_type: MediaType,
        listing: Listing,
        items: Vec<MediaItem>,
        page_size: usize,
    ) {
        let mut pages = self.pages.write().await;
        for (i, chunk) in items.chunks(page_size.max(1)).enumerate() {
            pages.insert((media_type, listing, i as u32 + 1), chunk.to_vec());
        }
    }

    pub async fn add_detail(&self, item: MediaItem) {
        self.details
            .write()
            .await
            .insert((item.media_type(), item.id), item);
    }

    pub async fn set_genres(&self, media_type: MediaType, genres: Vec<Genre>) {
        self.genres.write().await.insert(media_type, genres);
    }

    // =========================================================================
    // Failure and Latency Injection
    // =========================================================================

    /// Make every request for this page number fail with a 500.
    pub async fn fail_page(&self, page: u32) {
        self.failing_pages.write().await.insert(page);
    }

    pub async fn heal_page(&self, page: u32) {
        self.failing_pages.write().await.remove(&page);
    }

    /// Make detail requests for this id fail with a 500.
    pub async fn fail_detail(&self, id: u32) {
        self.failing_details.write().await.insert(id);
    }

    /// Delay responses for this page number.
    pub async fn set_page_delay(&self, page: u32, delay: Duration) {
        self.page_delays.write().await.insert(page, delay);
    }

    // =========================================================================
    // Request Recording
    // =========================================================================

    pub async fn recorded_requests(&self) -> Vec<RecordedCatalogRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests started.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Number of page and detail requests that ran to completion, successful or not.
    pub async fn completed_count(&self) -> usize {
        *self.completed.read().await
    }

    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
        *self.completed.write().await = 0;
    }

    async fn record(&self, request: RecordedCatalogRequest) {
        self.requests.write().await.push(request);
    }
}

#[async_trait]
impl CatalogProvider for MockCatalog {
    async fn page(
        &self,
        media_type: MediaType,
        listing: Listing,
        page: u32,
    ) -> Result<CatalogPage, CatalogError> {
        self.record(RecordedCatalogRequest::Page {
            media_type,
            listing,
            page,
        })
        .await;

        let delay = self.page_delays.read().await.get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing_pages.read().await.contains(&page) {
            Err(CatalogError::Status {
                status: 500,
                message: format!("mock failure on page {}", page),
            })
        } else {
            let pages = self.pages.read().await;
            let items = pages
                .get(&(media_type, listing, page))
                .cloned()
                .unwrap_or_default();
            let total_pages = pages
                .keys()
                .filter(|(mt, l, _)| *mt == media_type && *l == listing)
                .count() as u32;
            let total_results = items.len() as u32;
            Ok(CatalogPage {
                items,
                page,
                total_pages,
                total_results,
            })
        };

        *self.completed.write().await += 1;
        result
    }

    async fn detail(&self, media_type: MediaType, id: u32) -> Result<MediaItem, CatalogError> {
        self.record(RecordedCatalogRequest::Detail { media_type, id })
            .await;

        let result = if self.failing_details.read().await.contains(&id) {
            Err(CatalogError::Status {
                status: 500,
                message: format!("mock failure on {} {}", media_type, id),
            })
        } else {
            self.details
                .read()
                .await
                .get(&(media_type, id))
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("{} {}", media_type, id)))
        };

        *self.completed.write().await += 1;
        result
    }

    async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, CatalogError> {
        self.record(RecordedCatalogRequest::Genres { media_type })
            .await;

        Ok(self
            .genres
            .read()
            .await
            .get(&media_type)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
