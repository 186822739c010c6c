//! Pagination of book entry lists

/// Page size when the request gives none
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size a request may ask for
pub const MAX_PAGE_SIZE: usize = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Entries per page
    pub page_size: usize,
    /// Total number of pages
    pub total_pages: usize,
    /// Index of the first entry on the page
    pub offset: usize,
}

impl Pagination {
    /// Index range of the page within a list of `total` items
    pub fn range(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(total);
        let end = (self.offset + self.page_size).min(total);
        start..end
    }
}

/// Calculate pagination metadata from total results and the request
///
/// Page size is clamped to `1..=MAX_PAGE_SIZE` and the page to
/// `1..=total_pages`.
///
/// # Examples
/// ```
/// use vdp_vc::pagination::calculate_pagination;
///
/// // 45 entries at 20 per page = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, Some(3), None);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 40);
///
/// // Out-of-bounds requests get clamped
/// let p = calculate_pagination(45, Some(99), Some(500));
/// assert_eq!(p.page, 1);
/// assert_eq!(p.page_size, 100);
/// ```
pub fn calculate_pagination(
    total_results: usize,
    requested_page: Option<i64>,
    requested_page_size: Option<i64>,
) -> Pagination {
    let page_size = requested_page_size
        .map(|size| size.clamp(1, MAX_PAGE_SIZE as i64) as usize)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let total_pages = total_results.div_ceil(page_size);
    let page = requested_page
        .unwrap_or(1)
        .clamp(1, total_pages.max(1) as i64) as usize;

    Pagination {
        page,
        page_size,
        total_pages,
        offset: (page - 1) * page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = calculate_pagination(45, None, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 20);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 0);
        assert_eq!(p.range(45), 0..20);
    }

    #[test]
    fn test_pagination_last_partial_page() {
        let p = calculate_pagination(45, Some(3), Some(20));
        assert_eq!(p.page, 3);
        assert_eq!(p.range(45), 40..45);
    }

    #[test]
    fn test_pagination_out_of_bounds() {
        let p = calculate_pagination(45, Some(99), None);
        assert_eq!(p.page, 3);

        let p = calculate_pagination(45, Some(-4), None);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(calculate_pagination(10, None, Some(0)).page_size, 1);
        assert_eq!(calculate_pagination(10, None, Some(-3)).page_size, 1);
        assert_eq!(calculate_pagination(10, None, Some(1000)).page_size, 100);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, Some(5), None);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.range(0), 0..0);
    }
}
