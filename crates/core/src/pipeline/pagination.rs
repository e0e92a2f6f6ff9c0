//! Fixed-size page windows over an arranged list.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default items per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// The requested page no longer exists for the current result count.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Page {requested} is out of range ({total_pages} pages)")]
pub struct StateConflictError {
    pub requested: usize,
    pub total_pages: usize,
}

/// Current page of a screen. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub current_page: usize,
    pub page_size: usize,
}

impl PageState {
    pub fn first(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size,
        }
    }
}

/// Splits a list into pages of `page_size` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    page_size: usize,
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationWindow {
    /// Create a window. A page size of 0 is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages for `len` items. 0 for an empty list.
    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size)
    }

    /// Items of page `page`. Empty if the page is out of range.
    pub fn slice<'a, T>(&self, items: &'a [T], page: usize) -> &'a [T] {
        if page == 0 {
            return &[];
        }
        let start = (page - 1).saturating_mul(self.page_size);
        if start >= items.len() {
            return &[];
        }
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }

    /// Validate `page` against a list of `len` items.
    ///
    /// Page 1 is always valid, even for an empty list.
    pub fn check(&self, page: usize, len: usize) -> Result<usize, StateConflictError> {
        let total_pages = self.total_pages(len);
        if page >= 1 && page <= total_pages.max(1) {
            Ok(page)
        } else {
            Err(StateConflictError {
                requested: page,
                total_pages,
            })
        }
    }

    /// Move an out-of-range page to the nearest valid one.
    pub fn clamp(&self, page: usize, len: usize) -> usize {
        match self.check(page, len) {
            Ok(page) => page,
            Err(conflict) => {
                let resolved = conflict.total_pages.max(1).min(page.max(1));
                warn!("{}, moving to page {}", conflict, resolved);
                resolved
            }
        }
    }
}
