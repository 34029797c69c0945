//! Page-number pagination shared by every feed listing.
//!
//! All feeds slice an ordered post list into fixed-size pages addressed by a
//! `page` query parameter. Parsing is total: absent or unparsable input
//! falls back to the first page, and out-of-range numbers clamp to the
//! nearest valid page instead of erroring.

use serde::Serialize;

/// A requested page number as parsed from the query string. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(usize);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    /// Parse the `page` query parameter. Absent, empty, zero, negative, or
    /// non-numeric input all resolve to page 1.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&value| value >= 1)
            .map(PageNumber)
            .unwrap_or(Self::FIRST)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for PageNumber {
    fn from(value: usize) -> Self {
        PageNumber(value.max(1))
    }
}

/// The resolved window for one page of a listing, plus the metadata the
/// templates need to render pagination controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// Effective page number after clamping.
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Item offset of the first element on this page.
    pub offset: usize,
    /// Maximum number of items on this page.
    pub limit: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageWindow {
    pub fn previous_number(&self) -> usize {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> usize {
        (self.number + 1).min(self.total_pages)
    }
}

/// Splits ordered sequences into fixed-size pages.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    /// A zero page size is clamped to 1 so a window always holds something.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Compute the window for `requested` over `total_items` elements.
    ///
    /// An empty listing still reports one (empty) page so callers can render
    /// "page 1 of 1" without a special case. Requests past the end clamp to
    /// the last page; this mirrors the behavior listings have always had.
    pub fn paginate(&self, total_items: usize, requested: PageNumber) -> PageWindow {
        let total_pages = total_items.div_ceil(self.page_size).max(1);
        let number = requested.get().min(total_pages);
        let offset = (number - 1) * self.page_size;
        let limit = self.page_size.min(total_items.saturating_sub(offset));

        PageWindow {
            number,
            total_pages,
            total_items,
            offset,
            limit,
            has_previous: number > 1,
            has_next: number < total_pages,
        }
    }

    /// Slice an in-memory ordered sequence, returning the page items with
    /// their window. Pure; the caller owns the ordering.
    pub fn slice<'a, T>(&self, items: &'a [T], requested: PageNumber) -> (&'a [T], PageWindow) {
        let window = self.paginate(items.len(), requested);
        let end = window.offset + window.limit;
        (&items[window.offset..end], window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults_to_first_page() {
        assert_eq!(PageNumber::parse(None), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("abc")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("0")), PageNumber::FIRST);
        assert_eq!(PageNumber::parse(Some("-3")), PageNumber::FIRST);
    }

    #[test]
    fn parse_accepts_plain_numbers() {
        assert_eq!(PageNumber::parse(Some("2")).get(), 2);
        assert_eq!(PageNumber::parse(Some(" 7 ")).get(), 7);
    }

    #[test]
    fn thirteen_items_split_ten_and_three() {
        let items: Vec<u32> = (0..13).collect();
        let paginator = Paginator::new(10);

        let (first, window) = paginator.slice(&items, PageNumber::parse(Some("1")));
        assert_eq!(first.len(), 10);
        assert_eq!(window.total_pages, 2);
        assert!(window.has_next);
        assert!(!window.has_previous);

        let (second, window) = paginator.slice(&items, PageNumber::parse(Some("2")));
        assert_eq!(second.len(), 3);
        assert!(!window.has_next);
        assert!(window.has_previous);
    }

    #[test]
    fn page_counts_match_ceiling_division() {
        let paginator = Paginator::new(4);
        for total in 0..40 {
            let window = paginator.paginate(total, PageNumber::FIRST);
            let expected = if total == 0 { 1 } else { total.div_ceil(4) };
            assert_eq!(window.total_pages, expected, "total={total}");
        }
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let items: Vec<u32> = (0..22).collect();
        let paginator = Paginator::new(5);
        let (page, window) = paginator.slice(&items, PageNumber::from(5));
        assert_eq!(window.number, 5);
        assert_eq!(page, &[20, 21]);
    }

    #[test]
    fn out_of_range_requests_clamp_to_last_page() {
        let items: Vec<u32> = (0..13).collect();
        let paginator = Paginator::new(10);
        let (page, window) = paginator.slice(&items, PageNumber::parse(Some("99")));
        assert_eq!(window.number, 2);
        assert_eq!(page.len(), 3);
    }

    #[test]
    fn empty_listing_reports_a_single_empty_page() {
        let items: Vec<u32> = Vec::new();
        let paginator = Paginator::new(10);
        let (page, window) = paginator.slice(&items, PageNumber::FIRST);
        assert!(page.is_empty());
        assert_eq!(window.number, 1);
        assert_eq!(window.total_pages, 1);
        assert!(!window.has_next);
        assert!(!window.has_previous);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let paginator = Paginator::new(0);
        assert_eq!(paginator.page_size(), 1);
    }
}
