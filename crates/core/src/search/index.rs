//! Fuzzy title index over one collection.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::fuzzy::{fold, FuzzyOptions};
use crate::media::{Collection, MediaItem};
use crate::metrics::INDEX_SKIPPED_ITEMS;

/// An item could not be indexed. The item is left out of title search.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Item {id} has no title and was skipped from the search index")]
pub struct IndexBuildError {
    pub id: u32,
}

/// A search result: an item position in the collection and its match score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub position: usize,
    pub score: f64,
}

#[derive(Debug)]
struct IndexedTitle {
    position: usize,
    folded: Vec<char>,
}

/// Case-insensitive approximate title index.
///
/// Built once per collection; a new collection needs a new index.
#[derive(Debug)]
pub struct SearchIndex {
    collection: Arc<Collection>,
    options: FuzzyOptions,
    titles: Vec<IndexedTitle>,
    skipped: Vec<IndexBuildError>,
}

impl SearchIndex {
    /// Index every item that has a title. Untitled items are logged and skipped.
    pub fn build(collection: Arc<Collection>, options: FuzzyOptions) -> Self {
        let mut titles = Vec::with_capacity(collection.len());
        let mut skipped = Vec::new();

        for (position, item) in collection.iter().enumerate() {
            match item.indexable_title() {
                Some(title) => titles.push(IndexedTitle {
                    position,
                    folded: fold(title),
                }),
                None => {
                    let err = IndexBuildError { id: item.id };
                    warn!("{}", err);
                    INDEX_SKIPPED_ITEMS.inc();
                    skipped.push(err);
                }
            }
        }

        debug!(
            "Built search index: indexed={}, skipped={}",
            titles.len(),
            skipped.len()
        );

        Self {
            collection,
            options,
            titles,
            skipped,
        }
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    /// True if this index was built from exactly this collection instance.
    pub fn is_built_from(&self, collection: &Arc<Collection>) -> bool {
        Arc::ptr_eq(&self.collection, collection)
    }

    pub fn options(&self) -> FuzzyOptions {
        self.options
    }

    /// Items left out at build time.
    pub fn skipped(&self) -> &[IndexBuildError] {
        &self.skipped
    }

    /// Ranked matches for `term`, best first.
    ///
    /// Equal scores keep collection order. A blank term matches every item,
    /// untitled ones included, in collection order with score 0.
    pub fn search(&self, term: &str) -> Vec<SearchHit> {
        let term = term.trim();
        if term.is_empty() {
            return (0..self.collection.len())
                .map(|position| SearchHit {
                    position,
                    score: 0.0,
                })
                .collect();
        }

        let pattern = fold(term);
        let mut hits: Vec<SearchHit> = self
            .titles
            .iter()
            .filter_map(|title| {
                let m = self.options.best_match(&pattern, &title.folded);
                self.options.is_accepted(m.score).then_some(SearchHit {
                    position: title.position,
                    score: m.score,
                })
            })
            .collect();

        // sort_by is stable, and titles are stored in collection order
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits
    }

    /// Matching items for `term`, best first.
    pub fn query(&self, term: &str) -> Vec<&MediaItem> {
        let items = self.collection.items();
        self.search(term)
            .into_iter()
            .map(|hit| &items[hit.position])
            .collect()
    }
}
