//! Page arithmetic shared by list views.

use crate::models::SubmissionStatus;
use crate::service::ListQuery;

/// A 1-based page of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Creates a page request; page 0 is treated as page 1 and a zero limit as 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Records skipped before this page: `(page - 1) * limit`.
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Listing query for this page with an optional server-side status filter.
    pub fn query(&self, status: Option<SubmissionStatus>) -> ListQuery {
        ListQuery {
            status,
            limit: self.limit,
            offset: self.offset(),
        }
    }

    /// Whether this page lies past the last page for `total` records.
    pub fn is_past_end(&self, total: u64) -> bool {
        u64::from(self.offset()) >= total && self.page > 1
    }
}

/// Number of pages needed to show `total` records, `ceil(total / limit)`.
pub fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offsets() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
        assert_eq!(PageRequest::new(0, 20).offset(), 0);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(45, 20), 3);
        assert_eq!(page_count(40, 20), 2);
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn test_past_end() {
        assert!(!PageRequest::new(3, 20).is_past_end(45));
        assert!(PageRequest::new(4, 20).is_past_end(45));
        assert!(!PageRequest::new(1, 20).is_past_end(0));
    }

    #[test]
    fn test_query_carries_filter() {
        let query = PageRequest::new(2, 10).query(Some(SubmissionStatus::Done));
        assert_eq!(
            query,
            ListQuery {
                status: Some(SubmissionStatus::Done),
                limit: 10,
                offset: 10
            }
        );
    }

    proptest! {
        #[test]
        fn test_every_record_lands_on_exactly_one_page(
            total in 0u64..5_000,
            limit in 1u32..200,
        ) {
            let pages = page_count(total, limit);
            let mut covered = 0u64;
            for page in 1..=pages {
                let request = PageRequest::new(page as u32, limit);
                prop_assert!(!request.is_past_end(total));
                let on_page = (total - u64::from(request.offset())).min(u64::from(limit));
                prop_assert!(on_page > 0);
                covered += on_page;
            }
            prop_assert_eq!(covered, total);
            prop_assert!(PageRequest::new(pages as u32 + 1, limit).is_past_end(total) || total == 0);
        }
    }
}
