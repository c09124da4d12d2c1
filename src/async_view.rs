//! Async counterparts of [`CacheBox`](crate::cache::CacheBox) and
//! [`PaginatedView`](crate::view::PaginatedView).
//!
//! A reload stores its value only after the fetch future completes, so a
//! reader never observes a half-updated cache.

use super::{
    cache::CacheMode,
    errors::PagingError,
    model::{
        CacheStats,
        PageInfo,
        page_count_for,
        total_page_for,
    },
    options::PagingOptions,
    result::{
        FetchResult,
        PagingResult,
    },
    source::AsyncPageSource,
    view::PagingState,
};
use arc_swap::ArcSwapOption;
use futures::{
    FutureExt,
    future::BoxFuture,
    lock::Mutex,
};
use parking_lot::Mutex as EpochLock;
use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering},
    },
};
use tracing::{debug, trace};

pub type AsyncFetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;
pub type AsyncTransformer<T> = Arc<dyn Fn(T) -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;

// AsyncCacheBox

pub struct AsyncCacheBox<T>
where
    T: Send + Sync + 'static,
{
    fetch: AsyncFetcher<T>,
    transform: Option<AsyncTransformer<T>>,
    cached: ArcSwapOption<T>,
    // guard не держится через await
    epoch: EpochLock<u64>,
    mode: AtomicU8,
    suspend_depth: AtomicUsize,
    reloads: AtomicU64,
}

impl<T> AsyncCacheBox<T>
where
    T: Send + Sync + 'static,
{
    pub async fn new<F, Fut>(fetch: F, mode: CacheMode) -> PagingResult<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        Self::builder().fetch(fetch).mode(mode).build().await
    }

    pub fn builder() -> AsyncCacheBoxBuilder<T> {
        AsyncCacheBoxBuilder::new()
    }

    pub async fn value(&self) -> PagingResult<Arc<T>> {
        if let Some(cached) = self.cached.load_full() {
            trace!("async cache hit");
            return Ok(cached);
        }
        match self.mode() {
            CacheMode::Manual => Ok(Arc::new((self.fetch)().await?)),
            CacheMode::Auto | CacheMode::AutoWithPrefetch => self.reload().await,
        }
    }

    pub fn peek(&self) -> Option<Arc<T>> {
        self.cached.load_full()
    }

    /// Invalidation while the fetch future runs discards its result and fetches again.
    pub async fn reload(&self) -> PagingResult<Arc<T>> {
        self.cached.store(None);
        loop {
            let epoch = *self.epoch.lock();
            let raw = (self.fetch)().await?;
            let value = match &self.transform {
                Some(transform) => transform(raw).await?,
                None => raw,
            };
            let value = Arc::new(value);
            if !self.store_if_current(epoch, &value) {
                debug!(epoch, "async cache invalidated during reload, fetching again");
                continue;
            }
            let reloads = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(reloads, "async cache reloaded");
            return Ok(value);
        }
    }

    fn store_if_current(&self, epoch: u64, value: &Arc<T>) -> bool {
        let current = self.epoch.lock();
        if *current != epoch {
            return false;
        }
        self.cached.store(Some(Arc::clone(value)));
        true
    }

    fn drop_cached(&self) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        self.cached.store(None);
    }

    pub async fn ensure_cached(&self) -> PagingResult<()> {
        if !self.is_cached() {
            self.reload().await?;
        }
        Ok(())
    }

    pub async fn invalidate(&self) -> PagingResult<()> {
        self.drop_cached();
        if self.mode() == CacheMode::AutoWithPrefetch && !self.is_suspended() {
            self.reload().await?;
        }
        Ok(())
    }

    pub fn uncache(&self) {
        self.drop_cached();
    }

    pub fn suspend_auto_refresh(&self) -> AsyncSuspendGuard<'_, T> {
        self.suspend_depth.fetch_add(1, Ordering::AcqRel);
        AsyncSuspendGuard {
            owner: self,
            released: false,
        }
    }

    pub fn mode(&self) -> CacheMode {
        CacheMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn set_mode(&self, mode: CacheMode) -> &Self {
        self.mode.store(mode.to_u8(), Ordering::Release);
        self
    }

    pub fn is_cached(&self) -> bool {
        self.cached.load().is_some()
    }

    pub fn suspend_depth(&self) -> usize {
        self.suspend_depth.load(Ordering::Acquire)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspend_depth() > 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            mode: self.mode(),
            is_cached: self.is_cached(),
            suspend_depth: self.suspend_depth(),
            reloads: self.reloads.load(Ordering::Relaxed),
        }
    }
}

impl<T> fmt::Debug for AsyncCacheBox<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCacheBox")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Scope of suspended auto refresh for an [`AsyncCacheBox`].
///
/// `release().await` reloads once when the last guard goes, in every mode.
/// Drop cannot await, so a guard dropped without `release` only uncaches and
/// leaves the resync to the next read. Under `Manual` reads never store, so
/// after such a drop the box stays uncached until an explicit `reload` or
/// `ensure_cached`: release `Manual` scopes with `release().await`.
#[must_use = "auto refresh resumes as soon as the guard is dropped"]
pub struct AsyncSuspendGuard<'a, T>
where
    T: Send + Sync + 'static,
{
    owner: &'a AsyncCacheBox<T>,
    released: bool,
}

impl<T> AsyncSuspendGuard<'_, T>
where
    T: Send + Sync + 'static,
{
    pub async fn release(mut self) -> PagingResult<()> {
        self.released = true;
        let previous = self.owner.suspend_depth.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            self.owner.reload().await?;
        }
        Ok(())
    }
}

impl<T> Drop for AsyncSuspendGuard<'_, T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let previous = self.owner.suspend_depth.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            debug!("async suspend guard dropped, cache left for resync on next read");
            self.owner.uncache();
        }
    }
}

pub struct AsyncCacheBoxBuilder<T>
where
    T: Send + Sync + 'static,
{
    fetch: Option<AsyncFetcher<T>>,
    transform: Option<AsyncTransformer<T>>,
    mode: CacheMode,
}

impl<T> AsyncCacheBoxBuilder<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            fetch: None,
            transform: None,
            mode: CacheMode::Manual,
        }
    }

    pub fn fetch<F, Fut>(mut self, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        self.fetch = Some(Arc::new(move || fetch().boxed()));
        self
    }

    pub fn transform<M, Fut>(mut self, transform: M) -> Self
    where
        M: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        self.transform = Some(Arc::new(move |value| transform(value).boxed()));
        self
    }

    pub fn mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn build(self) -> PagingResult<AsyncCacheBox<T>> {
        let fetch = self.fetch
            .ok_or(PagingError::invalid_argument("fetch", "fetch callback is required"))?;
        let cache = AsyncCacheBox {
            fetch,
            transform: self.transform,
            cached: ArcSwapOption::empty(),
            epoch: EpochLock::new(0),
            mode: AtomicU8::new(self.mode.to_u8()),
            suspend_depth: AtomicUsize::new(0),
            reloads: AtomicU64::new(0),
        };
        cache.invalidate().await?;
        Ok(cache)
    }
}

impl<T> Default for AsyncCacheBoxBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// AsyncPaginatedView

pub struct AsyncPaginatedView<S>
where
    S: AsyncPageSource,
{
    source: Arc<S>,
    state: Arc<PagingState>,
    count_box: AsyncCacheBox<usize>,
    page_box: AsyncCacheBox<S::Window>,
    write_lock: Mutex<()>,
}

impl<S> AsyncPaginatedView<S>
where
    S: AsyncPageSource,
{
    pub async fn new(source: S, page_size: usize) -> PagingResult<Self> {
        Self::with_options(Arc::new(source), page_size, 1, PagingOptions::default()).await
    }

    pub async fn with_options(
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
        let count_box = AsyncCacheBox::builder()
            .fetch(move || {
                let source = Arc::clone(&count_source);
                async move { source.count().await }
            })
            .mode(options.count_cache)
            .build()
            .await?;

        let slice_source = Arc::clone(&source);
        let slice_state = Arc::clone(&state);
        let materialize_source = Arc::clone(&source);
        let page_box = AsyncCacheBox::builder()
            .fetch(move || {
                let source = Arc::clone(&slice_source);
                let bounds = slice_state.bounds();
                async move { source.slice(bounds).await }
            })
            .transform(move |window| {
                let source = Arc::clone(&materialize_source);
                async move { source.materialize(window).await }
            })
            .mode(options.page_cache)
            .build()
            .await?;

        debug!(page_size, page_index, "async paginated view created");
        Ok(Self {
            source,
            state,
            count_box,
            page_box,
            write_lock: Mutex::new(()),
        })
    }

    pub async fn current_page(&self) -> PagingResult<Arc<S::Window>> {
        self.page_box.value().await
    }

    pub async fn total_count(&self) -> PagingResult<usize> {
        Ok(*self.count_box.value().await?)
    }

    pub async fn total_page(&self) -> PagingResult<usize> {
        Ok(total_page_for(self.total_count().await?, self.page_size()))
    }

    pub async fn count(&self) -> PagingResult<usize> {
        Ok(page_count_for(self.total_count().await?, self.page_size(), self.page_index()))
    }

    pub fn page_index(&self) -> usize {
        self.state.page_index.load(Ordering::Acquire)
    }

    pub fn page_size(&self) -> usize {
        self.state.page_size.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::Acquire)
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn count_cache(&self) -> &AsyncCacheBox<usize> {
        &self.count_box
    }

    pub fn page_cache(&self) -> &AsyncCacheBox<S::Window> {
        &self.page_box
    }

    pub async fn page_info(&self) -> PagingResult<PageInfo> {
        let _guard = self.write_lock.lock().await;
        let total_count = self.total_count().await?;
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

    pub async fn set_page_index(&self, page_index: usize) -> PagingResult<&Self> {
        let _guard = self.write_lock.lock().await;
        if page_index == 0 {
            return Err(PagingError::OutOfRange {
                name: "page_index",
                value: page_index,
                min: 1,
                max: None,
            });
        }
        let total_page = self.total_page().await?;
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
            debug!(previous, page_index, generation, "async page index changed");
            self.page_box.invalidate().await?;
        }
        Ok(self)
    }

    pub async fn set_page_size(&self, page_size: usize) -> PagingResult<&Self> {
        let _guard = self.write_lock.lock().await;
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
        debug!(page_size, generation, "async page size changed, page index reset");
        self.page_box.invalidate().await?;
        Ok(self)
    }

    // Снимок текущей страницы
    pub async fn to_vec(&self) -> PagingResult<Vec<Arc<S::Item>>> {
        let window = self.current_page().await?;
        Ok(self.source.items(&window).await?)
    }
}

impl<S> fmt::Debug for AsyncPaginatedView<S>
where
    S: AsyncPageSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPaginatedView")
            .field("page_index", &self.page_index())
            .field("page_size", &self.page_size())
            .field("generation", &self.generation())
            .finish()
    }
}
