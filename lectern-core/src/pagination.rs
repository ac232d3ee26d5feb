//! Pagination parameters and the list envelope.
//!
//! Every list endpoint accepts `page`/`limit` and answers with
//! `{ items, totalPages, currentPage, total }`; the camelCase field names
//! are part of the wire contract with the existing frontend.

use serde::{Deserialize, Serialize};

/// Default page size when the client sends none.
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 100;

/// Normalized pagination parameters. Pages are 1-indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed page number
    pub page: u32,
    /// Page size, clamped to `1..=MAX_LIMIT`
    pub limit: u32,
}

impl Page {
    /// Normalize raw query parameters: missing values get defaults, zero and
    /// oversized values are clamped rather than rejected.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Number of records to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }

    /// Slice a fully loaded collection down to this page.
    ///
    /// The in-memory store paginates this way; the SQL store pushes
    /// `LIMIT`/`OFFSET` into the query instead.
    #[must_use]
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .iter()
            .skip(start)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the paging envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// The records on this page
    pub items: Vec<T>,
    /// Total number of pages for this query
    pub total_pages: u64,
    /// The page these items belong to
    pub current_page: u32,
    /// Total number of matching records
    pub total: u64,
}

impl<T> Paginated<T> {
    /// Wrap one page of items with the envelope computed from the total
    /// match count.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, page: Page) -> Self {
        Self {
            items,
            total_pages: total.div_ceil(u64::from(page.limit)),
            current_page: page.page,
            total,
        }
    }

    /// Map the items while keeping the envelope.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            current_page: self.current_page,
            total: self.total,
        }
    }
}
