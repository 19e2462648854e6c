//! Page/size resolution.
//!
//! Pagination never fails. Unless both `page` and `size` are present and both
//! parse as positive integers, the pair falls back to [`PageSpec::DEFAULT`]
//! as a whole; there is no partial default.

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Largest `LIMIT`/`OFFSET` PostgreSQL accepts (`bigint`)
const MAX_ROWS: u64 = i64::MAX as u64;

/// A resolved page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// 1-based page number
    pub page: u64,
    /// Rows per page
    pub size: u64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PageSpec {
    pub const DEFAULT: PageSpec = PageSpec { page: 1, size: 10 };

    /// Resolve the raw `page` and `size` values.
    ///
    /// ```
    /// use lifeguard_search::query::PageSpec;
    ///
    /// assert_eq!(PageSpec::resolve(Some("3"), Some("20")), PageSpec { page: 3, size: 20 });
    /// assert_eq!(PageSpec::resolve(Some("3"), None), PageSpec::DEFAULT);
    /// assert_eq!(PageSpec::resolve(Some("a"), Some("b")), PageSpec::DEFAULT);
    /// ```
    pub fn resolve(page: Option<&str>, size: Option<&str>) -> PageSpec {
        let (page, size) = match (page, size) {
            (Some(page), Some(size)) => (page, size),
            (None, None) => return PageSpec::DEFAULT,
            (page, size) => {
                log::debug!(
                    "pagination needs both page and size (page={page:?}, size={size:?}), using defaults"
                );
                record_fallback();
                return PageSpec::DEFAULT;
            }
        };

        match (parse_positive(page), parse_positive(size)) {
            (Some(page), Some(size)) => PageSpec { page, size },
            _ => {
                log::warn!("unparseable pagination (page={page:?}, size={size:?}), using defaults");
                record_fallback();
                PageSpec::DEFAULT
            }
        }
    }

    /// Rows to skip: `size * (page - 1)`, capped at the `bigint` maximum
    pub fn offset(&self) -> u64 {
        self.size
            .saturating_mul(self.page.saturating_sub(1))
            .min(MAX_ROWS)
    }

    /// Rows to return
    pub fn limit(&self) -> u64 {
        self.size
    }

    /// Same page with `size` capped at `max`
    pub fn clamped(self, max: u64) -> PageSpec {
        PageSpec {
            page: self.page,
            size: self.size.min(max),
        }
    }
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.parse::<i64>()
        .ok()
        .filter(|n| *n >= 1)
        .and_then(|n| u64::try_from(n).ok())
}

fn record_fallback() {
    #[cfg(feature = "metrics")]
    METRICS.record_pagination_fallback();
}
