//! Paging and pager options.
//!
//! Both structs deserialize with `#[serde(default)]` so a host application
//! can embed them in its own config file and override only some fields.

use crate::cache::CacheMode;
use serde::Deserialize;
use std::num::NonZeroUsize;

const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_MAX_VISIBLE_PAGES: usize = 9;

/// Cache policies for a paginated view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PagingOptions {
    /// Page size used by builders when none is given explicitly.
    pub default_page_size: usize,
    /// Policy of the total item count cache.
    pub count_cache: CacheMode,
    /// Policy of the current page window cache.
    pub page_cache: CacheMode,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            count_cache: CacheMode::Auto,
            page_cache: CacheMode::Auto,
        }
    }
}

impl PagingOptions {
    pub fn with_modes(count_cache: CacheMode, page_cache: CacheMode) -> Self {
        Self {
            count_cache,
            page_cache,
            ..Default::default()
        }
    }

    /// Same policy for both caches.
    pub fn uniform(mode: CacheMode) -> Self {
        Self::with_modes(mode, mode)
    }

    /// Returns the default page size, clamping to 1 if zero.
    pub fn default_page_size_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.default_page_size).unwrap_or(NonZeroUsize::MIN)
    }
}

/// When a pager shows a navigation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkVisibility {
    Always,
    /// Hidden when the link would point at the current page.
    #[default]
    Auto,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PagerOptions {
    /// Maximum count of numbered page items.
    pub max_visible_pages: usize,
    pub first_last: LinkVisibility,
    pub previous_next: LinkVisibility,
    /// Emit omitted-range markers when the numbered window is cut.
    pub show_omitted: bool,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            max_visible_pages: DEFAULT_MAX_VISIBLE_PAGES,
            first_last: LinkVisibility::Auto,
            previous_next: LinkVisibility::Auto,
            show_omitted: true,
        }
    }
}

impl PagerOptions {
    pub fn max_visible_pages_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_visible_pages).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let options = PagingOptions::default();
        assert_eq!(options.default_page_size, 20);
        assert_eq!(options.count_cache, CacheMode::Auto);
        assert_eq!(options.page_cache, CacheMode::Auto);

        let pager = PagerOptions::default();
        assert_eq!(pager.max_visible_pages, 9);
        assert_eq!(pager.first_last, LinkVisibility::Auto);
        assert!(pager.show_omitted);
    }

    #[test]
    fn test_non_zero_clamps_to_min() {
        let options = PagingOptions {
            default_page_size: 0,
            ..Default::default()
        };
        assert_eq!(options.default_page_size_non_zero().get(), 1);

        let pager = PagerOptions {
            max_visible_pages: 0,
            ..Default::default()
        };
        assert_eq!(pager.max_visible_pages_non_zero().get(), 1);
    }

    #[test]
    fn test_uniform() {
        let options = PagingOptions::uniform(CacheMode::Manual);
        assert_eq!(options.count_cache, CacheMode::Manual);
        assert_eq!(options.page_cache, CacheMode::Manual);
        assert_eq!(options.default_page_size, 20);
    }
}
