//! Media model: items, genres and deduplicated collections.

mod types;

pub use types::*;
