use std::ops::RangeInclusive;

use super::QueryParameters;

/// Splits a record set of known size into fixed-size page requests.
///
/// The page count is `total / page_size + 1`. When the total is an exact
/// multiple of the page size, the last page is requested even though it is
/// known to be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total_count: u64,
    page_size: u32,
}

impl Paginator {
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    pub fn new(total_count: u64, page_size: u32) -> Self {
        assert!(page_size > 0, "page size must be positive");
        Self {
            total_count,
            page_size,
        }
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of page requests to issue.
    pub fn page_count(&self) -> u32 {
        let pages = self.total_count / u64::from(self.page_size) + 1;
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// 1-based indices of the pages to request.
    pub fn pages(&self) -> RangeInclusive<u32> {
        1..=self.page_count()
    }

    /// Parameters of every page request, derived from `base`, in page order.
    pub fn requests<'a>(
        &self,
        base: &'a QueryParameters,
    ) -> impl Iterator<Item = QueryParameters> + 'a {
        let page_size = self.page_size;
        self.pages()
            .map(move |page_no| base.for_page(page_no, page_size))
    }
}
