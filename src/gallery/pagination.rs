use std::fmt;

/// Items revealed per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Grows the materialised prefix of the shuffled order one page at a time.
///
/// `shown` may exceed the order length (a 5-item result still starts at one
/// page); every read clamps against the length passed in.
#[derive(Debug, Clone)]
pub struct Pagination {
    page_size: usize,
    shown: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            shown: page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    /// Back to the first page. Called on every filter change.
    pub fn reset(&mut self) {
        self.shown = self.page_size;
    }

    /// Reveals one more page, never past `total`.
    ///
    /// # Returns
    /// `true` if the prefix grew.
    pub fn advance(&mut self, total: usize) -> bool {
        if self.is_exhausted(total) {
            return false;
        }
        self.shown = (self.shown + self.page_size).min(total);
        true
    }

    pub fn is_exhausted(&self, total: usize) -> bool {
        self.shown >= total
    }

    /// Number of items of a `total`-long order currently revealed.
    pub fn visible_len(&self, total: usize) -> usize {
        self.shown.min(total)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Trailing affordance under the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    /// A staged load is in flight.
    Loading,
    ScrollForMore,
    /// End of results. `shown` is the number of items actually on screen.
    AllLoaded { shown: usize, total: usize },
}

impl fmt::Display for Footer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading…"),
            Self::ScrollForMore => f.write_str("Scroll for more"),
            Self::AllLoaded { shown, .. } => write!(f, "All images loaded ({})", shown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one_page() {
        let pagination = Pagination::default();
        assert_eq!(pagination.shown(), 20);
        assert_eq!(pagination.visible_len(25), 20);
        assert_eq!(pagination.visible_len(5), 5);
    }

    #[test]
    fn test_advance_clamps_and_stops() {
        let mut pagination = Pagination::new(20);
        assert!(pagination.advance(25));
        assert_eq!(pagination.shown(), 25);
        assert!(pagination.is_exhausted(25));

        assert!(!pagination.advance(25));
        assert_eq!(pagination.shown(), 25);
    }

    #[test]
    fn test_monotonic_until_reset() {
        let mut pagination = Pagination::new(7);
        let mut last = pagination.shown();
        for _ in 0..10 {
            pagination.advance(50);
            assert!(pagination.shown() >= last);
            assert!(pagination.shown() <= 50);
            last = pagination.shown();
        }
        assert_eq!(last, 50);

        pagination.reset();
        assert_eq!(pagination.shown(), 7);
    }

    #[test]
    fn test_short_result_is_exhausted_immediately() {
        let mut pagination = Pagination::default();
        assert!(pagination.is_exhausted(0));
        assert!(pagination.is_exhausted(12));
        assert!(!pagination.advance(12));
        assert_eq!(pagination.shown(), 20);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let mut pagination = Pagination::new(0);
        assert_eq!(pagination.page_size(), 1);
        assert!(pagination.advance(3));
        assert_eq!(pagination.shown(), 2);
    }

    #[test]
    fn test_footer_text() {
        assert_eq!(
            Footer::AllLoaded { shown: 25, total: 25 }.to_string(),
            "All images loaded (25)"
        );
        assert_eq!(Footer::ScrollForMore.to_string(), "Scroll for more");
    }
}
