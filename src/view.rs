use super::{
    cache::{CacheBox, CacheMode},
    errors::PagingError,
    model::{
        PageInfo,
        page_count_for,
        total_page_for,
    },
    options::PagingOptions,
    result::PagingResult,
    source::{
        PageBounds,
        PageSource,
        sequence::SequenceSource,
    },
};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};
use tracing::debug;

// Состояние пагинации, общее для view и fetch-замыканий CacheBox.
pub(crate) struct PagingState {
    pub(crate) page_index: AtomicUsize,
    pub(crate) page_size: AtomicUsize,
    pub(crate) generation: AtomicU64,
}

impl PagingState {
    pub(crate) fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index: AtomicUsize::new(page_index),
            page_size: AtomicUsize::new(page_size),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn bounds(&self) -> PageBounds {
        PageBounds::for_page(
            self.page_index.load(Ordering::Acquire),
            self.page_size.load(Ordering::Acquire),
        )
    }

    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

// PaginatedView

pub struct PaginatedView<S>
where
    S: PageSource,
{
    source: Arc<S>,
    state: Arc<PagingState>,
    count_box: CacheBox<usize>,
    page_box: CacheBox<S::Window>,
    write_lock: RwLock<()>,
}

impl<S> PaginatedView<S>
where
    S: PageSource,
{
    // Constructors

    pub fn new(source: S, page_size: usize) -> PagingResult<Self> {
        Self::with_options(Arc::new(source), page_size, 1, PagingOptions::default())
    }

    /// Builds a view without checking `page_index` against the total page
    /// count: the count may be unknown until the first read.
    pub fn with_options(
        source: Arc<S>,
        page_size: usize,
        page_index: usize,
        options: PagingOptions,
    ) -> PagingResult<Self> {
        if page_size == 0 {
            return Err(PagingError::invalid_argument("page_size", "page size must be positive"));
        }
        if page_index == 0 {
            return Err(PagingError::invalid_argument("page_index", "page index starts at 1"));
        }
        let state = Arc::new(PagingState::new(page_index, page_size));

        let count_source = Arc::clone(&source);
        let count_box = CacheBox::builder()
            .fetch(move || count_source.count())
            .mode(options.count_cache)
            .build()?;

        let slice_source = Arc::clone(&source);
        let slice_state = Arc::clone(&state);
        let materialize_source = Arc::clone(&source);
        let page_box = CacheBox::builder()
            .fetch(move || slice_source.slice(slice_state.bounds()))
            .transform(move |window| materialize_source.materialize(window))
            .mode(options.page_cache)
            .build()?;

        debug!(page_size, page_index, ?options, "paginated view created");
        Ok(Self {
            source,
            state,
            count_box,
            page_box,
            write_lock: RwLock::new(()),
        })
    }

    pub fn builder(source: S) -> PaginatedViewBuilder<S> {
        PaginatedViewBuilder::new(source)
    }

    // Core Access Methods

    pub fn current_page(&self) -> PagingResult<Arc<S::Window>> {
        self.page_box.value()
    }

    pub fn total_count(&self) -> PagingResult<usize> {
        Ok(*self.count_box.value()?)
    }

    pub fn total_page(&self) -> PagingResult<usize> {
        Ok(total_page_for(self.total_count()?, self.page_size()))
    }

    // Количество элементов в текущем окне
    pub fn count(&self) -> PagingResult<usize> {
        Ok(page_count_for(self.total_count()?, self.page_size(), self.page_index()))
    }

    pub fn page_index(&self) -> usize {
        self.state.page_index.load(Ordering::Acquire)
    }

    pub fn page_size(&self) -> usize {
        self.state.page_size.load(Ordering::Acquire)
    }

    pub fn is_first_page(&self) -> bool {
        self.page_index() == 1
    }

    pub fn is_last_page(&self) -> PagingResult<bool> {
        Ok(self.page_index() == self.total_page()?)
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index() > 1
    }

    pub fn has_next_page(&self) -> PagingResult<bool> {
        Ok(self.page_index() < self.total_page()?)
    }

    pub fn page_info(&self) -> PagingResult<PageInfo> {
        let _guard = self.write_lock.read();
        let total_count = self.total_count()?;
        let page_size = self.page_size();
        let page_index = self.page_index();
        Ok(PageInfo {
            page_index,
            page_size,
            total_count,
            total_page: total_page_for(total_count, page_size),
            count: page_count_for(total_count, page_size, page_index),
        })
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    // Меняется при каждом фактическом изменении page_index/page_size
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::Acquire)
    }

    pub fn count_cache(&self) -> &CacheBox<usize> {
        &self.count_box
    }

    pub fn page_cache(&self) -> &CacheBox<S::Window> {
        &self.page_box
    }

    // Mutation Methods

    pub fn set_page_index(&self, page_index: usize) -> PagingResult<&Self> {
        let _guard = self.write_lock.write();
        if page_index == 0 {
            return Err(PagingError::OutOfRange {
                name: "page_index",
                value: page_index,
                min: 1,
                max: None,
            });
        }
        let total_page = self.total_page()?;
        if page_index > total_page {
            return Err(PagingError::OutOfRange {
                name: "page_index",
                value: page_index,
                min: 1,
                max: Some(total_page),
            });
        }
        let previous = self.state.page_index.swap(page_index, Ordering::AcqRel);
        if previous != page_index {
            let generation = self.state.bump_generation();
            debug!(previous, page_index, generation, "page index changed");
            self.page_box.invalidate()?;
        }
        Ok(self)
    }

    // Всегда сбрасывает page_index в 1 и инвалидирует окно, счётчик не трогает
    pub fn set_page_size(&self, page_size: usize) -> PagingResult<&Self> {
        let _guard = self.write_lock.write();
        if page_size == 0 {
            return Err(PagingError::OutOfRange {
                name: "page_size",
                value: page_size,
                min: 1,
                max: None,
            });
        }
        self.state.page_size.store(page_size, Ordering::Release);
        self.state.page_index.store(1, Ordering::Release);
        let generation = self.state.bump_generation();
        debug!(page_size, generation, "page size changed, page index reset");
        self.page_box.invalidate()?;
        Ok(self)
    }

    // Navigation Methods

    pub fn next_page(&self) -> PagingResult<bool> {
        if !self.has_next_page()? {
            return Ok(false);
        }
        self.set_page_index(self.page_index() + 1)?;
        Ok(true)
    }

    pub fn previous_page(&self) -> PagingResult<bool> {
        if !self.has_previous_page() {
            return Ok(false);
        }
        self.set_page_index(self.page_index() - 1)?;
        Ok(true)
    }

    pub fn first_page(&self) -> PagingResult<&Self> {
        self.set_page_index(1)
    }

    pub fn last_page(&self) -> PagingResult<&Self> {
        let total_page = self.total_page()?;
        self.set_page_index(total_page)
    }

    // Перечитывает и счётчик, и окно
    pub fn refresh(&self) -> PagingResult<&Self> {
        let _guard = self.write_lock.write();
        self.count_box.reload()?;
        self.page_box.reload()?;
        Ok(self)
    }

    // Enumeration

    /// Snapshot of the current page. Later paging changes do not affect it;
    /// call again to restart from the live page.
    pub fn iter(&self) -> PagingResult<PageIter<S::Item>> {
        let generation = self.generation();
        let window = self.current_page()?;
        let items = self.source.items(&window)?;
        Ok(PageIter {
            items: items.into_iter(),
            generation,
        })
    }

    /// Iterator that fails with `ConcurrentModification` once the paging
    /// state changes after it was created.
    pub fn cursor(&self) -> PagingResult<PageCursor<'_, S>> {
        let iter = self.iter()?;
        Ok(PageCursor {
            view: self,
            expected: iter.generation,
            items: iter.items,
            failed: false,
        })
    }

    pub fn to_vec(&self) -> PagingResult<Vec<Arc<S::Item>>> {
        Ok(self.iter()?.collect())
    }
}

impl<S> fmt::Debug for PaginatedView<S>
where
    S: PageSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedView")
            .field("page_index", &self.page_index())
            .field("page_size", &self.page_size())
            .field("generation", &self.generation())
            .field("count_cache", &self.count_box)
            .field("page_cache", &self.page_box)
            .finish()
    }
}

// Iterators

pub struct PageIter<T> {
    items: std::vec::IntoIter<Arc<T>>,
    generation: u64,
}

impl<T> PageIter<T> {
    // Поколение состояния, с которого снят снимок
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Iterator for PageIter<T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> ExactSizeIterator for PageIter<T> {}

pub struct PageCursor<'a, S>
where
    S: PageSource,
{
    view: &'a PaginatedView<S>,
    expected: u64,
    items: std::vec::IntoIter<Arc<S::Item>>,
    failed: bool,
}

impl<S> Iterator for PageCursor<'_, S>
where
    S: PageSource,
{
    type Item = PagingResult<Arc<S::Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let found = self.view.generation();
        if found != self.expected {
            self.failed = true;
            return Some(Err(PagingError::ConcurrentModification {
                expected: self.expected,
                found,
            }));
        }
        self.items.next().map(Ok)
    }
}

// Builder

pub struct PaginatedViewBuilder<S>
where
    S: PageSource,
{
    source: Arc<S>,
    page_size: Option<usize>,
    page_index: usize,
    options: PagingOptions,
}

impl<S> PaginatedViewBuilder<S>
where
    S: PageSource,
{
    pub fn new(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    pub fn from_shared(source: Arc<S>) -> Self {
        Self {
            source,
            page_size: None,
            page_index: 1,
            options: PagingOptions::default(),
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page_index(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    pub fn options(mut self, options: PagingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn count_cache(mut self, mode: CacheMode) -> Self {
        self.options.count_cache = mode;
        self
    }

    pub fn page_cache(mut self, mode: CacheMode) -> Self {
        self.options.page_cache = mode;
        self
    }

    /// Without an explicit `page_size` the options' default is used, a zero
    /// default is clamped to 1. An explicit zero is still rejected.
    pub fn build(self) -> PagingResult<PaginatedView<S>> {
        let page_size = self.page_size
            .unwrap_or_else(|| self.options.default_page_size_non_zero().get());
        PaginatedView::with_options(self.source, page_size, self.page_index, self.options)
    }
}

// Traits

pub trait IntoPaginatedView {
    type Item: Send + Sync + 'static;

    fn into_paged(self, page_size: usize) -> PagingResult<PaginatedView<SequenceSource<Self::Item>>>;
}

impl<T: Send + Sync + 'static> IntoPaginatedView for Vec<T> {
    type Item = T;

    fn into_paged(self, page_size: usize) -> PagingResult<PaginatedView<SequenceSource<T>>> {
        PaginatedView::new(SequenceSource::from_vec(self), page_size)
    }
}
