//! Offset pagination.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Page`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    /// Page numbers start at 1.
    #[error("page must be at least 1")]
    PageTooSmall,
    /// A page must hold at least one row.
    #[error("count must be at least 1")]
    CountTooSmall,
}

/// A 1-based page of `count` rows.
///
/// ```
/// use orderly_core::Page;
///
/// let page = Page::new(2, 5).unwrap();
/// assert_eq!(page.offset(), 5);
/// assert_eq!(page.limit(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    page: u32,
    count: u32,
}

impl Page {
    /// Default rows per page for list endpoints.
    pub const DEFAULT_COUNT: u32 = 10;

    /// Create a page.
    ///
    /// # Errors
    ///
    /// Returns an error if `page` or `count` is zero.
    pub const fn new(page: u32, count: u32) -> Result<Self, PageError> {
        if page == 0 {
            return Err(PageError::PageTooSmall);
        }
        if count == 0 {
            return Err(PageError::CountTooSmall);
        }
        Ok(Self { page, count })
    }

    /// Rows to skip: `(page - 1) * count`.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.count)
    }

    /// Rows to return.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.count)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            count: Self::DEFAULT_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_has_no_offset() {
        assert_eq!(Page::default().offset(), 0);
        assert_eq!(Page::default().limit(), 10);
    }

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(Page::new(0, 10), Err(PageError::PageTooSmall));
        assert_eq!(Page::new(1, 0), Err(PageError::CountTooSmall));
    }

    #[test]
    fn test_offset_does_not_overflow() {
        let page = Page::new(u32::MAX, u32::MAX).map(|p| p.offset());
        assert_eq!(page, Ok((u64::from(u32::MAX) - 1) * u64::from(u32::MAX)));
    }
}
