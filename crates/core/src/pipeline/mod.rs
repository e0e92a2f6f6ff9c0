//! Presentation pipeline: filter, sort and paginate a collection.
//!
//! ```text
//! Collection ──▶ SearchIndex ──▶ FilterPipeline ──▶ SortStage ──▶ PaginationWindow
//! ```
//!
//! [`Browser`] wires the stages together for one screen.

mod browser;
mod filter;
mod pagination;
mod sort;

pub use browser::{Applied, Browser, PageView, QueryTicket};
pub use filter::{FilterPipeline, FilterState, ItemPredicate, MemberOf, MATCH_ALL_GENRE};
pub use pagination::{PageState, PaginationWindow, StateConflictError, DEFAULT_PAGE_SIZE};
pub use sort::{
    by_date, by_earnings, by_popularity, by_rating, Comparator, SortMode, SortStage,
    UnknownSortMode,
};
