//! Approximate title search.

mod fuzzy;
mod index;

pub use fuzzy::{fold, FuzzyMatch, FuzzyOptions, DEFAULT_DISTANCE, DEFAULT_THRESHOLD};
pub use index::{IndexBuildError, SearchHit, SearchIndex};
