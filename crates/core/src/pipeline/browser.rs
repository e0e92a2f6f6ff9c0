//! A browsing screen: one collection with its filter, sort and page.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::filter::{FilterPipeline, FilterState};
use super::pagination::{PageState, PaginationWindow};
use super::sort::{SortMode, SortStage};
use crate::aggregator::{FetchError, PageAggregator};
use crate::catalog::QueryKey;
use crate::media::{Collection, MediaItem};
use crate::search::{FuzzyOptions, SearchIndex};

/// Handed out by [`Browser::begin_query`]. Its response installs only while
/// its key is still the latest one asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket<K = QueryKey> {
    key: K,
}

impl<K> QueryTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

/// Outcome of [`Browser::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The collection was installed and the arrangement recomputed.
    Installed,
    /// The same collection instance was already installed.
    Unchanged,
    /// A query for a different key was started since; the response was dropped.
    Discarded,
}

/// One page of a screen, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct PageView<K = QueryKey> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<K>,
    pub items: Vec<MediaItem>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub filter: FilterState,
    pub sort: SortMode,
}

/// State of one browsing screen.
///
/// `K` identifies the collection on screen: a catalog [`QueryKey`] for
/// listings, or any other key for collections built elsewhere. The filtered
/// and sorted arrangement is recomputed whenever the collection, the filter
/// or the sort mode changes. Moving between pages only re-slices it.
#[derive(Debug)]
pub struct Browser<K = QueryKey> {
    key: Option<K>,
    latest_key: Option<K>,
    index: SearchIndex,
    filter: FilterState,
    sort: SortMode,
    page: PageState,
    window: PaginationWindow,
    pipeline: FilterPipeline,
    sorter: SortStage,
    arranged: Vec<usize>,
}

impl<K: Clone + PartialEq + fmt::Display> Browser<K> {
    pub fn new(options: FuzzyOptions, page_size: usize) -> Self {
        let window = PaginationWindow::new(page_size);
        Self {
            key: None,
            latest_key: None,
            index: SearchIndex::build(Arc::new(Collection::new()), options),
            filter: FilterState::default(),
            sort: SortMode::default(),
            page: PageState::first(window.page_size()),
            window,
            pipeline: FilterPipeline::new(),
            sorter: SortStage::new(),
            arranged: Vec::new(),
        }
    }

    /// Replace the filter pipeline, e.g. with a fresh predicate snapshot.
    /// The page is kept, clamped to the new arrangement.
    pub fn set_pipeline(&mut self, pipeline: FilterPipeline) {
        self.pipeline = pipeline;
        self.rearrange();
        self.page.current_page = self
            .window
            .clamp(self.page.current_page, self.arranged.len());
    }

    /// Key of the installed collection.
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn collection(&self) -> &Arc<Collection> {
        self.index.collection()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn page(&self) -> PageState {
        self.page
    }

    /// Start a query for `key`. Tickets for any other key become stale.
    pub fn begin_query(&mut self, key: K) -> QueryTicket<K> {
        self.latest_key = Some(key.clone());
        QueryTicket { key }
    }

    /// Install the response to `ticket`.
    ///
    /// Responses whose key is no longer the latest one asked for are dropped.
    /// Several in-flight responses for the latest key all install. A new key
    /// starts at page 1 with filter and sort kept. A refreshed collection for
    /// the same key keeps the page, clamped to the new total.
    pub fn apply(&mut self, ticket: &QueryTicket<K>, collection: Arc<Collection>) -> Applied {
        if self.latest_key.as_ref() != Some(&ticket.key) {
            if let Some(latest) = &self.latest_key {
                debug!(
                    "Discarding stale response: key={}, latest={}",
                    ticket.key, latest
                );
            }
            return Applied::Discarded;
        }

        let same_key = self.key.as_ref() == Some(&ticket.key);
        if same_key && self.index.is_built_from(&collection) {
            return Applied::Unchanged;
        }

        self.index = SearchIndex::build(collection, self.index.options());
        self.key = Some(ticket.key.clone());
        self.rearrange();

        self.page.current_page = if same_key {
            self.window.clamp(self.page.current_page, self.arranged.len())
        } else {
            1
        };

        debug!(
            "Installed collection: key={}, items={}, arranged={}",
            ticket.key,
            self.index.collection().len(),
            self.arranged.len()
        );
        Applied::Installed
    }


    /// Set the title query, resetting the genre. Returns false if nothing changed.
    pub fn set_title_query(&mut self, query: impl Into<String>) -> bool {
        let mut next = self.filter.clone();
        next.set_title_query(query);
        self.set_filter(next)
    }

    /// Set the genre, clearing the title query. Returns false if nothing changed.
    pub fn set_genre(&mut self, genre_id: impl Into<String>) -> bool {
        let mut next = self.filter.clone();
        next.set_genre(genre_id);
        self.set_filter(next)
    }

    /// Replace the whole filter state. Returns false if nothing changed.
    pub fn set_filter(&mut self, filter: FilterState) -> bool {
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.rearrange();
        self.page.current_page = 1;
        true
    }

    pub fn set_sort(&mut self, sort: SortMode) -> bool {
        if sort == self.sort {
            return false;
        }
        self.sort = sort;
        self.rearrange();
        self.page.current_page = 1;
        true
    }

    /// Go to page `page`, clamped to the available pages. Returns the page
    /// actually selected.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.page.current_page = self.window.clamp(page, self.arranged.len());
        self.page.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.window.total_pages(self.arranged.len())
    }

    /// All filtered and sorted items.
    pub fn arranged(&self) -> Vec<&MediaItem> {
        let items = self.index.collection().items();
        self.arranged.iter().map(|&p| &items[p]).collect()
    }

    /// Items on the current page.
    pub fn page_items(&self) -> Vec<&MediaItem> {
        let items = self.index.collection().items();
        self.window
            .slice(&self.arranged, self.page.current_page)
            .iter()
            .map(|&p| &items[p])
            .collect()
    }

    pub fn view(&self) -> PageView<K> {
        PageView {
            key: self.key.clone(),
            items: self.page_items().into_iter().cloned().collect(),
            page: self.page.current_page,
            page_size: self.window.page_size(),
            total_pages: self.total_pages(),
            total_results: self.arranged.len(),
            filter: self.filter.clone(),
            sort: self.sort,
        }
    }

    fn rearrange(&mut self) {
        let mut positions = self.pipeline.select(&self.index, &self.filter);
        self.sorter
            .sort_positions(self.index.collection(), &mut positions, self.sort);
        self.arranged = positions;
    }
}

impl Browser<QueryKey> {
    /// Fetch `key` through the aggregator and install it.
    pub async fn load(
        &mut self,
        aggregator: &PageAggregator,
        key: QueryKey,
    ) -> Result<Applied, FetchError> {
        aggregator.check(&key)?;
        let ticket = self.begin_query(key);
        let collection = aggregator.fetch(ticket.key()).await?;
        Ok(self.apply(&ticket, collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaType;
    use crate::pipeline::MemberOf;

    fn collection(count: u32) -> Arc<Collection> {
        Arc::new(
            (1..=count)
                .map(|i| {
                    MediaItem::movie(i, format!("Movie {}", i))
                        .with_genres([if i % 2 == 0 { 18 } else { 35 }])
                        .with_popularity(i as f64)
                })
                .collect(),
        )
    }

    fn browser_with(count: u32, page_size: usize) -> Browser {
        let mut browser = Browser::new(FuzzyOptions::default(), page_size);
        let ticket = browser.begin_query(QueryKey::discover(MediaType::Movie, 1));
        assert_eq!(browser.apply(&ticket, collection(count)), Applied::Installed);
        browser
    }

    fn ids(items: &[MediaItem]) -> Vec<u32> {
        items.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_last_page_of_twenty_five() {
        let mut browser = browser_with(25, 8);
        assert_eq!(browser.set_page(4), 4);

        let view = browser.view();
        assert_eq!(view.total_pages, 4);
        assert_eq!(view.total_results, 25);
        assert_eq!(ids(&view.items), vec![25]);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut browser = Browser::new(FuzzyOptions::default(), 10);
        let first = browser.begin_query(QueryKey::discover(MediaType::Movie, 1));
        let second = browser.begin_query(QueryKey::discover(MediaType::Tv, 1));

        assert_eq!(browser.apply(&first, collection(3)), Applied::Discarded);
        assert!(browser.key().is_none());

        assert_eq!(browser.apply(&second, collection(5)), Applied::Installed);
        assert_eq!(browser.key().unwrap().media_type, MediaType::Tv);

        // A late response for the first query cannot overwrite the second
        assert_eq!(browser.apply(&first, collection(3)), Applied::Discarded);
        assert_eq!(browser.view().total_results, 5);
    }

    #[test]
    fn test_same_key_responses_all_install() {
        let mut browser = Browser::new(FuzzyOptions::default(), 10);
        let key = QueryKey::discover(MediaType::Movie, 1);
        let first = browser.begin_query(key.clone());
        let second = browser.begin_query(key);

        // The earlier ticket answers first and is still current
        assert_eq!(browser.apply(&first, collection(3)), Applied::Installed);
        assert_eq!(browser.apply(&second, collection(4)), Applied::Installed);
        assert_eq!(browser.view().total_results, 4);
    }

    #[test]
    fn test_returning_to_a_key_revives_its_ticket() {
        let mut browser = Browser::new(FuzzyOptions::default(), 10);
        let movies = QueryKey::discover(MediaType::Movie, 1);
        let first = browser.begin_query(movies.clone());
        browser.begin_query(QueryKey::discover(MediaType::Tv, 1));
        browser.begin_query(movies);

        assert_eq!(browser.apply(&first, collection(3)), Applied::Installed);
    }

    #[test]
    fn test_set_pipeline_clamps_page() {
        let mut browser = browser_with(25, 5);
        browser.set_page(5);

        let pipeline = FilterPipeline::new().with_predicate(MemberOf([1, 2, 3, 4, 5, 6].into()));
        browser.set_pipeline(pipeline);

        assert_eq!(browser.total_pages(), 2);
        assert_eq!(browser.page().current_page, 2);
        assert_eq!(ids(&browser.view().items), vec![6]);
    }

    #[test]
    fn test_custom_key_type() {
        let mut browser: Browser<String> = Browser::new(FuzzyOptions::default(), 10);
        let ticket = browser.begin_query("alice/movie".to_string());
        assert_eq!(browser.apply(&ticket, collection(2)), Applied::Installed);
        assert_eq!(browser.view().key.as_deref(), Some("alice/movie"));
    }

    #[test]
    fn test_same_collection_is_unchanged() {
        let mut browser = Browser::new(FuzzyOptions::default(), 10);
        let shared = collection(3);
        let key = QueryKey::discover(MediaType::Movie, 1);

        let ticket = browser.begin_query(key.clone());
        assert_eq!(browser.apply(&ticket, Arc::clone(&shared)), Applied::Installed);
        let ticket = browser.begin_query(key);
        assert_eq!(browser.apply(&ticket, shared), Applied::Unchanged);
    }

    #[test]
    fn test_filter_and_sort_reset_page() {
        let mut browser = browser_with(25, 5);
        browser.set_page(3);

        assert!(browser.set_sort(SortMode::Popularity));
        assert_eq!(browser.page().current_page, 1);
        assert_eq!(ids(&browser.view().items), vec![25, 24, 23, 22, 21]);

        browser.set_page(2);
        assert!(browser.set_genre("18"));
        assert_eq!(browser.page().current_page, 1);
        assert_eq!(browser.view().total_results, 12);

        // Unchanged input keeps the page
        browser.set_page(2);
        assert!(!browser.set_genre("18"));
        assert!(!browser.set_sort(SortMode::Popularity));
        assert_eq!(browser.page().current_page, 2);
    }

    #[test]
    fn test_title_query_clears_genre() {
        let mut browser = browser_with(12, 20);
        browser.set_genre("35");
        browser.set_title_query("Movie 12");

        let view = browser.view();
        assert_eq!(view.filter.genre_id(), "0");
        assert_eq!(view.items.first().map(|m| m.id), Some(12));
    }

    #[test]
    fn test_paging_never_rearranges() {
        let mut browser = browser_with(25, 8);
        browser.set_sort(SortMode::Popularity);
        let arranged: Vec<u32> = browser.arranged().iter().map(|m| m.id).collect();

        let mut paged = Vec::new();
        for page in 1..=browser.total_pages() {
            browser.set_page(page);
            paged.extend(ids(&browser.view().items));
        }
        assert_eq!(paged, arranged);
    }

    #[test]
    fn test_new_key_resets_page_and_keeps_filter() {
        let mut browser = browser_with(25, 5);
        browser.set_sort(SortMode::Popularity);
        browser.set_page(4);

        let ticket = browser.begin_query(QueryKey::discover(MediaType::Movie, 2));
        browser.apply(&ticket, collection(40));

        assert_eq!(browser.page().current_page, 1);
        assert_eq!(browser.sort(), SortMode::Popularity);
    }

    #[test]
    fn test_refresh_clamps_page() {
        let mut browser = browser_with(25, 5);
        browser.set_page(5);

        let ticket = browser.begin_query(QueryKey::discover(MediaType::Movie, 1));
        assert_eq!(browser.apply(&ticket, collection(12)), Applied::Installed);

        assert_eq!(browser.page().current_page, 3);
        assert_eq!(ids(&browser.view().items), vec![11, 12]);
    }

    #[test]
    fn test_empty_collection_view() {
        let browser = browser_with(0, 10);
        let view = browser.view();
        assert_eq!(view.page, 1);
        assert_eq!(view.total_pages, 0);
        assert!(view.items.is_empty());
    }
}
