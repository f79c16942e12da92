//! Page/limit pagination for post listings.

use serde::Deserialize;

use crate::cache::list_key;

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

/// Raw `?page=&limit=` parameters.
///
/// Both are kept as strings so that garbage values fall back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
        }
    }
}

/// A resolved `(limit, offset)` window over the post collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: usize,
    pub offset: usize,
}

impl PageWindow {
    /// Page numbers start at 1; non-positive or unparseable values use the defaults
    /// and the limit is capped at [`MAX_PAGE_LIMIT`].
    pub fn from_query(query: &PageQuery) -> Self {
        let page = parse_positive(query.page.as_deref()).unwrap_or(1);
        let limit = parse_positive(query.limit.as_deref())
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT);

        Self {
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    pub fn cache_key(&self) -> String {
        list_key(self.limit, self.offset)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse::<usize>().ok().filter(|value| *value >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn defaults_to_first_page_of_ten() {
        let window = PageWindow::from_query(&PageQuery::default());
        assert_eq!(window, PageWindow { limit: 10, offset: 0 });
        assert_eq!(window.cache_key(), "10:0");
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let window = PageWindow::from_query(&PageQuery::new(3, 5));
        assert_eq!(window, PageWindow { limit: 5, offset: 10 });
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let window = PageWindow::from_query(&query(Some("-2"), Some("abc")));
        assert_eq!(window, PageWindow { limit: 10, offset: 0 });

        let window = PageWindow::from_query(&query(Some("0"), Some("0")));
        assert_eq!(window, PageWindow { limit: 10, offset: 0 });
    }

    #[test]
    fn limit_is_capped() {
        let window = PageWindow::from_query(&query(None, Some("5000")));
        assert_eq!(window.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let window = PageWindow::from_query(&query(Some(&usize::MAX.to_string()), Some("10")));
        assert_eq!(window.offset, usize::MAX);
    }
}
