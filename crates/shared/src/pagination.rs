//! Offset-based pagination utilities.

use serde::{Deserialize, Serialize};

/// Maximum page size accepted from callers.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when none is supplied.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Normalized pagination parameters.
///
/// `page` is 1-indexed. Out-of-range values are clamped rather than
/// rejected so list endpoints stay forgiving about caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl PageParams {
    /// Creates normalized parameters: `page >= 1`, `1 <= limit <= MAX_PAGE_SIZE`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based offset of the first item on this page.
    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * (self.limit as usize)
    }

    /// Returns the half-open index range `[start, end)` this page covers
    /// within a collection of `total` items. The range is empty when the
    /// page lies beyond the collection.
    pub fn slice_bounds(&self, total: usize) -> (usize, usize) {
        let start = self.offset().min(total);
        let end = (start + self.limit as usize).min(total);
        (start, end)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl PageInfo {
    /// Builds page metadata for `total` items under the given parameters.
    pub fn new(params: PageParams, total: u64) -> Self {
        let pages = total.div_ceil(params.limit as u64) as u32;
        Self {
            page: params.page,
            limit: params.limit,
            total,
            pages,
        }
    }

    /// Metadata for an empty result set.
    pub fn empty(params: PageParams) -> Self {
        Self::new(params, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_clamps_zero_page() {
        let params = PageParams::new(0, 50);
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_params_clamps_limit() {
        assert_eq!(PageParams::new(1, 0).limit, 1);
        assert_eq!(PageParams::new(1, 500).limit, MAX_PAGE_SIZE);
        assert_eq!(PageParams::new(1, 25).limit, 25);
    }

    #[test]
    fn test_offset_arithmetic() {
        assert_eq!(PageParams::new(1, 10).offset(), 0);
        assert_eq!(PageParams::new(2, 10).offset(), 10);
        assert_eq!(PageParams::new(3, 25).offset(), 50);
    }

    #[test]
    fn test_slice_bounds_within_collection() {
        let params = PageParams::new(2, 5);
        assert_eq!(params.slice_bounds(12), (5, 10));
    }

    #[test]
    fn test_slice_bounds_partial_last_page() {
        let params = PageParams::new(3, 5);
        assert_eq!(params.slice_bounds(12), (10, 12));
    }

    #[test]
    fn test_slice_bounds_beyond_collection() {
        let params = PageParams::new(10, 5);
        assert_eq!(params.slice_bounds(12), (12, 12));
    }

    #[test]
    fn test_page_info_rounds_up() {
        let info = PageInfo::new(PageParams::new(2, 5), 12);
        assert_eq!(info.pages, 3);
        assert_eq!(info.total, 12);
        assert_eq!(info.page, 2);
    }

    #[test]
    fn test_page_info_exact_division() {
        let info = PageInfo::new(PageParams::new(1, 10), 30);
        assert_eq!(info.pages, 3);
    }

    #[test]
    fn test_page_info_empty() {
        let info = PageInfo::empty(PageParams::new(1, 100));
        assert_eq!(info.total, 0);
        assert_eq!(info.pages, 0);
    }
}
