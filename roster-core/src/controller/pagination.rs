//! Roster pagination: page bounds derived from the team's member count.

/// Members shown per roster page.
pub const PER_PAGE: u32 = 5;

/// `1 <= page <= max(page_count, 1)` holds after every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    per_page: u32,
    total: usize,
}

impl Pagination {
    pub fn new(total: usize, per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            total,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// `ceil(total / per_page)`; zero for an empty roster.
    pub fn page_count(&self) -> u32 {
        self.total.div_ceil(self.per_page as usize) as u32
    }

    fn last_page(&self) -> u32 {
        self.page_count().max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }

    /// Navigation is rendered only when there is more than one page.
    pub fn shows_controls(&self) -> bool {
        self.page_count() > 1
    }

    /// Number of rows before the current page.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }

    /// Move to `page`. Returns false (and changes nothing) when `page` is out
    /// of bounds or already current.
    pub fn go_to(&mut self, page: u32) -> bool {
        if page == 0 || page > self.page_count() || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    /// Update the member count, pulling the page back inside the new bounds.
    /// Returns true if the page moved.
    pub fn set_total(&mut self, total: usize) -> bool {
        self.total = total;
        let last = self.last_page();
        if self.page > last {
            self.page = last;
            return true;
        }
        false
    }
}
