//! Pager model: which navigation items to show for a page position.
//!
//! Produces an ordered list of items (first, previous, omitted markers,
//! numbered pages, next, last). Rendering them is up to the caller.

use super::{
    errors::PagingError,
    options::{LinkVisibility, PagerOptions},
    result::PagingResult,
    source::PageSource,
    view::PaginatedView,
};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagerItem {
    First { target: usize },
    Previous { target: usize },
    /// Pages `from..=to` are not listed.
    Omitted { from: usize, to: usize },
    Page { number: usize, active: bool },
    Next { target: usize },
    Last { target: usize },
}

impl PagerItem {
    /// Page the item points at, `None` for omitted markers.
    pub fn target(&self) -> Option<usize> {
        match self {
            Self::First { target }
            | Self::Previous { target }
            | Self::Next { target }
            | Self::Last { target } => Some(*target),
            Self::Page { number, .. } => Some(*number),
            Self::Omitted { .. } => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Page { active: true, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    total_page: usize,
    page_index: usize,
    options: PagerOptions,
}

impl Pager {
    pub fn new(total_page: usize, page_index: usize, options: PagerOptions) -> PagingResult<Self> {
        if total_page == 0 {
            return Err(PagingError::OutOfRange {
                name: "total_page",
                value: total_page,
                min: 1,
                max: None,
            });
        }
        if page_index == 0 || page_index > total_page {
            return Err(PagingError::OutOfRange {
                name: "page_index",
                value: page_index,
                min: 1,
                max: Some(total_page),
            });
        }
        Ok(Self {
            total_page,
            page_index,
            options,
        })
    }

    pub fn for_view<S>(view: &PaginatedView<S>, options: PagerOptions) -> PagingResult<Self>
    where
        S: PageSource,
    {
        Self::new(view.total_page()?, view.page_index(), options)
    }

    pub fn total_page(&self) -> usize {
        self.total_page
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    // Окно номеров вокруг текущей страницы, прижатое к границам.
    // max_visible_pages из конфига может быть любым, окно не шире total_page.
    pub fn visible_range(&self) -> RangeInclusive<usize> {
        let max_visible = self.options.max_visible_pages_non_zero().get().min(self.total_page);
        let half = (max_visible - 1) / 2;
        let mut start = self.page_index.saturating_sub(half).max(1);
        let end = start.saturating_add(max_visible - 1).min(self.total_page);
        if end - start + 1 < max_visible {
            start = end.saturating_sub(max_visible - 1).max(1);
        }
        start..=end
    }

    pub fn items(&self) -> Vec<PagerItem> {
        let range = self.visible_range();
        let (start, end) = (*range.start(), *range.end());
        let has_previous = self.page_index > 1;
        let has_next = self.page_index < self.total_page;
        let mut items = Vec::with_capacity((end - start).saturating_add(7));

        if Self::visible(self.options.first_last, has_previous) {
            items.push(PagerItem::First { target: 1 });
        }
        if Self::visible(self.options.previous_next, has_previous) {
            items.push(PagerItem::Previous { target: self.page_index.saturating_sub(1).max(1) });
        }
        if self.options.show_omitted && start > 1 {
            items.push(PagerItem::Omitted { from: 1, to: start - 1 });
        }
        items.extend(range.map(|number| PagerItem::Page {
            number,
            active: number == self.page_index,
        }));
        if self.options.show_omitted && end < self.total_page {
            items.push(PagerItem::Omitted { from: end + 1, to: self.total_page });
        }
        if Self::visible(self.options.previous_next, has_next) {
            items.push(PagerItem::Next { target: (self.page_index + 1).min(self.total_page) });
        }
        if Self::visible(self.options.first_last, has_next) {
            items.push(PagerItem::Last { target: self.total_page });
        }
        items
    }

    #[inline]
    fn visible(visibility: LinkVisibility, useful: bool) -> bool {
        match visibility {
            LinkVisibility::Always => true,
            LinkVisibility::Auto => useful,
            LinkVisibility::Never => false,
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn numbers(pager: &Pager) -> Vec<usize> {
        pager.items()
            .iter()
            .filter_map(|item| match item {
                PagerItem::Page { number, .. } => Some(*number),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_window_centered() {
        let pager = Pager::new(20, 10, PagerOptions { max_visible_pages: 5, ..Default::default() }).unwrap();
        assert_eq!(pager.visible_range(), 8..=12);
        assert_eq!(numbers(&pager), vec![8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_window_shifted_at_edges() {
        let options = PagerOptions { max_visible_pages: 5, ..Default::default() };
        assert_eq!(Pager::new(20, 1, options).unwrap().visible_range(), 1..=5);
        assert_eq!(Pager::new(20, 20, options).unwrap().visible_range(), 16..=20);
        assert_eq!(Pager::new(3, 2, options).unwrap().visible_range(), 1..=3);
    }

    #[test]
    fn test_full_item_order() {
        let pager = Pager::new(20, 10, PagerOptions { max_visible_pages: 3, ..Default::default() }).unwrap();
        let items = pager.items();
        assert_eq!(items.first(), Some(&PagerItem::First { target: 1 }));
        assert_eq!(items[1], PagerItem::Previous { target: 9 });
        assert_eq!(items[2], PagerItem::Omitted { from: 1, to: 8 });
        assert!(items[4].is_active());
        assert_eq!(items[6], PagerItem::Omitted { from: 12, to: 20 });
        assert_eq!(items[7], PagerItem::Next { target: 11 });
        assert_eq!(items.last(), Some(&PagerItem::Last { target: 20 }));
        assert_eq!(items.len(), 9);
    }

    #[test]
    fn test_auto_hides_links_on_first_page() {
        let pager = Pager::new(3, 1, PagerOptions::default()).unwrap();
        let items = pager.items();
        assert!(!items.iter().any(|item| matches!(item, PagerItem::First { .. } | PagerItem::Previous { .. })));
        assert!(items.contains(&PagerItem::Next { target: 2 }));
        assert!(!items.iter().any(|item| matches!(item, PagerItem::Omitted { .. })));
    }

    #[test]
    fn test_huge_max_visible_pages() {
        let options = PagerOptions { max_visible_pages: usize::MAX, ..Default::default() };
        let pager = Pager::new(5, 2, options).unwrap();
        assert_eq!(pager.visible_range(), 1..=5);
        assert_eq!(numbers(&pager), vec![1, 2, 3, 4, 5]);

        let pager = Pager::new(usize::MAX, usize::MAX - 1, options).unwrap();
        assert_eq!(pager.visible_range(), 1..=usize::MAX);
    }

    #[test]
    fn test_invalid_position() {
        assert!(Pager::new(0, 1, PagerOptions::default()).unwrap_err().is_out_of_range());
        assert!(Pager::new(3, 4, PagerOptions::default()).unwrap_err().is_out_of_range());
    }
}
