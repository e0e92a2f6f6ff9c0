//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits,
//! so the pipeline and favourites can be exercised end to end without a
//! catalog API or a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use filmdeck_core::testing::{fixtures, MockCatalog, MockPersistence};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_pages(MediaType::Movie, Listing::Discover, fixtures::movies(1..=45), 20).await;
//!
//! let persistence = MockPersistence::new();
//! persistence.fail_inserts(true).await;
//!
//! // Use in AppState...
//! ```

mod mock_catalog;
mod mock_persistence;

pub use mock_catalog::{MockCatalog, RecordedCatalogRequest};
pub use mock_persistence::{MockPersistence, RecordedPersistenceCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::media::{Collection, Genre, MediaItem};

    /// Genre ids used by the fixtures.
    pub const ACTION: u32 = 28;
    pub const COMEDY: u32 = 35;
    pub const DRAMA: u32 = 18;
    pub const SCIENCE_FICTION: u32 = 878;

    /// A movie with reasonable defaults derived from its id.
    pub fn movie(id: u32, title: &str) -> MediaItem {
        MediaItem::movie(id, title)
            .with_genres([genre_for(id)])
            .with_release_date(date_for(id))
            .with_vote_average(5.0 + (id % 50) as f32 / 10.0)
            .with_popularity(id as f64 * 1.5)
    }

    /// A TV show with reasonable defaults derived from its id.
    pub fn show(id: u32, name: &str) -> MediaItem {
        MediaItem::tv(id, name)
            .with_genres([genre_for(id)])
            .with_release_date(date_for(id))
            .with_vote_average(6.0 + (id % 40) as f32 / 10.0)
            .with_popularity(id as f64)
    }

    /// Movies titled "Movie {id}" for every id in the range.
    pub fn movies(ids: impl IntoIterator<Item = u32>) -> Vec<MediaItem> {
        ids.into_iter()
            .map(|id| movie(id, &format!("Movie {}", id)))
            .collect()
    }

    /// Shows titled "Show {id}" for every id in the range.
    pub fn shows(ids: impl IntoIterator<Item = u32>) -> Vec<MediaItem> {
        ids.into_iter()
            .map(|id| show(id, &format!("Show {}", id)))
            .collect()
    }

    /// A small, recognizable movie collection.
    pub fn classic_movies() -> Collection {
        vec![
            movie(11, "Star Wars").with_genres([ACTION, SCIENCE_FICTION]),
            movie(181808, "Star Wars: The Last Jedi")
                .with_genres([ACTION, SCIENCE_FICTION])
                .with_revenue(1_332_539_889),
            movie(949, "Heat").with_genres([ACTION, DRAMA]),
            movie(194, "Amélie").with_genres([COMEDY]),
            movie(603, "The Matrix")
                .with_genres([ACTION, SCIENCE_FICTION])
                .with_revenue(463_517_383),
        ]
        .into_iter()
        .collect()
    }

    pub fn movie_genres() -> Vec<Genre> {
        vec![
            Genre {
                id: ACTION,
                name: "Action".to_string(),
            },
            Genre {
                id: COMEDY,
                name: "Comedy".to_string(),
            },
            Genre {
                id: DRAMA,
                name: "Drama".to_string(),
            },
            Genre {
                id: SCIENCE_FICTION,
                name: "Science Fiction".to_string(),
            },
        ]
    }

    fn genre_for(id: u32) -> u32 {
        match id % 3 {
            0 => ACTION,
            1 => COMEDY,
            _ => DRAMA,
        }
    }

    fn date_for(id: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(1980 + (id % 40) as i32, 1 + id % 12, 1 + id % 28)
            .unwrap_or_default()
    }
}
