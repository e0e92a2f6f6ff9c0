//! Title and genre filtering.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::media::MediaItem;
use crate::search::SearchIndex;

/// Genre id that matches every item.
pub const MATCH_ALL_GENRE: &str = "0";

/// Current filter inputs of a screen.
///
/// Title and genre are mutually exclusive: setting one resets the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    title_query: String,
    genre_id: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            title_query: String::new(),
            genre_id: MATCH_ALL_GENRE.to_string(),
        }
    }
}

impl FilterState {
    pub fn title(query: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.set_title_query(query);
        state
    }

    pub fn genre(genre_id: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.set_genre(genre_id);
        state
    }

    pub fn title_query(&self) -> &str {
        &self.title_query
    }

    pub fn genre_id(&self) -> &str {
        &self.genre_id
    }

    /// Set the title query and reset the genre to match-all.
    pub fn set_title_query(&mut self, query: impl Into<String>) {
        self.title_query = query.into();
        self.genre_id = MATCH_ALL_GENRE.to_string();
    }

    /// Set the genre and clear the title query.
    pub fn set_genre(&mut self, genre_id: impl Into<String>) {
        self.genre_id = genre_id.into();
        self.title_query.clear();
    }

    /// The genre to filter on, or `None` for match-all.
    ///
    /// `"0"`, empty and anything that is not a positive integer match all.
    pub fn genre_filter(&self) -> Option<u32> {
        self.genre_id.trim().parse::<u32>().ok().filter(|&id| id > 0)
    }

    pub fn has_title_query(&self) -> bool {
        !self.title_query.trim().is_empty()
    }

    pub fn is_match_all(&self) -> bool {
        !self.has_title_query() && self.genre_filter().is_none()
    }
}

/// Extra per-item condition applied after title and genre.
pub trait ItemPredicate: Send + Sync + fmt::Debug {
    fn matches(&self, item: &MediaItem) -> bool;
}

/// Items whose id is in a fixed set, e.g. a favourites snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemberOf(pub HashSet<u32>);

impl ItemPredicate for MemberOf {
    fn matches(&self, item: &MediaItem) -> bool {
        self.0.contains(&item.id)
    }
}

/// Composes the title search, the genre test and any extra predicates.
///
/// Output depends only on the index contents and the filter state.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    predicates: Vec<Arc<dyn ItemPredicate>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: impl ItemPredicate + 'static) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Positions of matching items.
    ///
    /// With a title query, positions are in search rank order; otherwise in
    /// collection order.
    pub fn select(&self, index: &SearchIndex, state: &FilterState) -> Vec<usize> {
        let items = index.collection().items();
        let genre = state.genre_filter();

        let candidates: Vec<usize> = if state.has_title_query() {
            index
                .search(state.title_query())
                .into_iter()
                .map(|hit| hit.position)
                .collect()
        } else {
            (0..items.len()).collect()
        };

        candidates
            .into_iter()
            .filter(|&position| {
                let item = &items[position];
                genre.map_or(true, |g| item.genre_ids.contains(&g))
                    && self.predicates.iter().all(|p| p.matches(item))
            })
            .collect()
    }

    /// Matching items, in the same order as [`FilterPipeline::select`].
    pub fn apply<'a>(&self, index: &'a SearchIndex, state: &FilterState) -> Vec<&'a MediaItem> {
        let items = index.collection().items();
        self.select(index, state)
            .into_iter()
            .map(|position| &items[position])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Collection;
    use chrono::NaiveDate;
    use crate::search::FuzzyOptions;

    fn index() -> SearchIndex {
        let collection: Collection = vec![
            MediaItem::movie(1, "Heat")
                .with_genres([80, 18])
                .with_release_date(NaiveDate::from_ymd_opt(1995, 12, 15).unwrap()),
            MediaItem::movie(2, "Alien")
                .with_genres([27, 878])
                .with_release_date(NaiveDate::from_ymd_opt(1979, 5, 25).unwrap()),
            MediaItem::movie(3, "Aliens").with_genres([878, 28]),
            MediaItem::movie(4, "Collateral")
                .with_genres([80])
                .with_release_date(NaiveDate::from_ymd_opt(2004, 8, 6).unwrap()),
        ]
        .into_iter()
        .collect();
        SearchIndex::build(Arc::new(collection), FuzzyOptions::default())
    }

    fn ids(items: &[&MediaItem]) -> Vec<u32> {
        items.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_match_all_genre_leaves_collection_unchanged() {
        let index = index();
        let pipeline = FilterPipeline::new();
        let result = pipeline.apply(&index, &FilterState::genre("0"));
        assert_eq!(ids(&result), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unparsable_genre_matches_all() {
        let index = index();
        let pipeline = FilterPipeline::new();
        for genre in ["", "abc", "-3"] {
            assert_eq!(pipeline.apply(&index, &FilterState::genre(genre)).len(), 4);
        }
    }

    #[test]
    fn test_genre_membership() {
        let index = index();
        let pipeline = FilterPipeline::new();
        assert_eq!(
            ids(&pipeline.apply(&index, &FilterState::genre("878"))),
            vec![2, 3]
        );
        assert!(pipeline.apply(&index, &FilterState::genre("99")).is_empty());
    }

    #[test]
    fn test_title_resets_genre_and_back() {
        let mut state = FilterState::genre("80");
        state.set_title_query("alien");
        assert_eq!(state.genre_id(), MATCH_ALL_GENRE);

        state.set_genre("878");
        assert_eq!(state.title_query(), "");
        assert_eq!(state.genre_filter(), Some(878));
    }

    #[test]
    fn test_title_query_uses_index_rank() {
        let index = index();
        let result = FilterPipeline::new().apply(&index, &FilterState::title("aliens"));
        assert_eq!(ids(&result), vec![3, 2]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let index = index();
        let pipeline = FilterPipeline::new();
        let state = FilterState::genre("80");

        let once = pipeline.apply(&index, &state);
        let filtered: Collection = once.iter().map(|m| (*m).clone()).collect();
        let reindexed = SearchIndex::build(Arc::new(filtered), FuzzyOptions::default());
        let twice = pipeline.apply(&reindexed, &state);

        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(ids(&once), ids(&pipeline.apply(&index, &state)));
    }

    #[test]
    fn test_extra_predicates() {
        let index = index();
        let favourites = FilterPipeline::new().with_predicate(MemberOf([2, 4].into()));
        assert_eq!(
            ids(&favourites.apply(&index, &FilterState::genre("80"))),
            vec![4]
        );
    }
}
