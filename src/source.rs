pub mod iter;
pub mod query;
pub mod sequence;
pub mod stream;

use crate::result::FetchResult;
use async_trait::async_trait;
use std::{ops::Range, sync::Arc};

// Границы окна страницы в источнике: skip = size * (index - 1), take = size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageBounds {
    pub skip: usize,
    pub take: usize,
}

impl PageBounds {
    // page_index с 1, page_size > 0 проверяются вызывающей стороной
    pub fn for_page(page_index: usize, page_size: usize) -> Self {
        Self {
            skip: page_size.saturating_mul(page_index.saturating_sub(1)),
            take: page_size,
        }
    }

    // Диапазон, обрезанный по длине источника
    pub fn clamp_to(&self, len: usize) -> Range<usize> {
        let start = self.skip.min(len);
        let end = start.saturating_add(self.take).min(len);
        start..end
    }
}

/// Adapter binding a paginated view to a concrete kind of source.
///
/// `slice` may return a lazy window (a view into the source or a deferred
/// query); `materialize` detaches it into a snapshot fit for caching.
pub trait PageSource: Send + Sync + 'static {
    type Item: Send + Sync + 'static;
    type Window: Send + Sync + 'static;

    fn count(&self) -> FetchResult<usize>;

    fn slice(&self, bounds: PageBounds) -> FetchResult<Self::Window>;

    fn materialize(&self, window: Self::Window) -> FetchResult<Self::Window>;

    fn items(&self, window: &Self::Window) -> FetchResult<Vec<Arc<Self::Item>>>;
}

/// Async counterpart of [`PageSource`].
#[async_trait]
pub trait AsyncPageSource: Send + Sync + 'static {
    type Item: Send + Sync + 'static;
    type Window: Send + Sync + 'static;

    async fn count(&self) -> FetchResult<usize>;

    async fn slice(&self, bounds: PageBounds) -> FetchResult<Self::Window>;

    async fn materialize(&self, window: Self::Window) -> FetchResult<Self::Window>;

    async fn items(&self, window: &Self::Window) -> FetchResult<Vec<Arc<Self::Item>>>;
}

/// Detached page window: the items of one page, shared and immutable.
/// Adapters that can only collect a page (iterators, streams) use it as
/// their window directly.
pub type PageSnapshot<T> = Arc<[Arc<T>]>;

// PageSlice - окно in-memory источника

pub enum PageSlice<T> {
    // zero-copy окно поверх источника
    View {
        source: Arc<Vec<Arc<T>>>,
        range: Range<usize>,
    },
    // отвязанная от источника копия ссылок
    Snapshot(PageSnapshot<T>),
}

impl<T> PageSlice<T> {
    pub fn as_slice(&self) -> &[Arc<T>] {
        match self {
            Self::View { source, range } => &source[range.clone()],
            Self::Snapshot(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::View { range, .. } => range.len(),
            Self::Snapshot(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.as_slice().iter()
    }

    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.as_slice().to_vec()
    }
}

impl<T: Clone> PageSlice<T> {
    pub fn to_owned_items(&self) -> Vec<T> {
        self.iter().map(|item| (**item).clone()).collect()
    }
}

impl<T> Clone for PageSlice<T> {
    fn clone(&self) -> Self {
        match self {
            Self::View { source, range } => Self::View {
                source: Arc::clone(source),
                range: range.clone(),
            },
            Self::Snapshot(items) => Self::Snapshot(Arc::clone(items)),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PageSlice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a PageSlice<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
