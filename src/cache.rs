use super::{
    errors::PagingError,
    model::CacheStats,
    result::{
        FetchResult,
        PagingResult,
    },
};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Deserialize;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering},
    },
};
use tracing::{debug, trace, warn};

pub type Fetcher<T> = Arc<dyn Fn() -> FetchResult<T> + Send + Sync>;
pub type Transformer<T> = Arc<dyn Fn(T) -> FetchResult<T> + Send + Sync>;

// CacheMode

/// When a [`CacheBox`] fills itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Always uses real-time fetched data until the value is cached manually
    /// with `reload` or `ensure_cached`.
    #[default]
    Manual,
    /// The first read caches the value, later reads return it until invalidated.
    Auto,
    /// Like `Auto`, but invalidation reloads immediately unless refresh is suspended.
    AutoWithPrefetch,
}

impl CacheMode {
    pub fn is_auto(&self) -> bool {
        !matches!(self, Self::Manual)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Manual => 0,
            Self::Auto => 1,
            Self::AutoWithPrefetch => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Auto,
            2 => Self::AutoWithPrefetch,
            _ => Self::Manual,
        }
    }
}

// CacheBox

pub struct CacheBox<T>
where
    T: Send + Sync + 'static,
{
    fetch: Fetcher<T>,
    transform: Option<Transformer<T>>,
    cached: ArcSwapOption<T>,
    // Растёт при каждом invalidate/uncache; reload сохраняет значение,
    // только если эпоха не изменилась за время fetch.
    epoch: Mutex<u64>,
    mode: AtomicU8,
    suspend_depth: AtomicUsize,
    reloads: AtomicU64,
}

impl<T> CacheBox<T>
where
    T: Send + Sync + 'static,
{
    // Constructors

    pub fn new<F>(fetch: F, mode: CacheMode) -> PagingResult<Self>
    where
        F: Fn() -> FetchResult<T> + Send + Sync + 'static,
    {
        Self::builder().fetch(fetch).mode(mode).build()
    }

    pub fn with_transform<F, M>(fetch: F, transform: M, mode: CacheMode) -> PagingResult<Self>
    where
        F: Fn() -> FetchResult<T> + Send + Sync + 'static,
        M: Fn(T) -> FetchResult<T> + Send + Sync + 'static,
    {
        Self::builder().fetch(fetch).transform(transform).mode(mode).build()
    }

    pub fn builder() -> CacheBoxBuilder<T> {
        CacheBoxBuilder::new()
    }

    // Access

    /// Cached value if present, otherwise fetched according to the mode.
    ///
    /// `Manual` never stores what it fetches and skips the transform: every
    /// uncached read goes to the source again.
    pub fn value(&self) -> PagingResult<Arc<T>> {
        if let Some(cached) = self.cached.load_full() {
            trace!("cache hit");
            return Ok(cached);
        }
        match self.mode() {
            CacheMode::Manual => {
                trace!("manual fetch, not cached");
                Ok(Arc::new((self.fetch)()?))
            }
            CacheMode::Auto | CacheMode::AutoWithPrefetch => self.reload(),
        }
    }

    /// Cached value without touching the source.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.cached.load_full()
    }

    // Cache control

    /// Fetches, transforms and stores unconditionally.
    /// A failed fetch or transform leaves the box uncached.
    ///
    /// An invalidation that lands while fetching discards the result and
    /// the fetch runs again, so a value read from stale state is never stored.
    pub fn reload(&self) -> PagingResult<Arc<T>> {
        self.cached.store(None);
        loop {
            let epoch = *self.epoch.lock();
            let raw = (self.fetch)()?;
            let value = match &self.transform {
                Some(transform) => transform(raw)?,
                None => raw,
            };
            let value = Arc::new(value);
            {
                let current = self.epoch.lock();
                if *current != epoch {
                    debug!(epoch, current = *current, "cache invalidated during reload, fetching again");
                    continue;
                }
                self.cached.store(Some(Arc::clone(&value)));
            }
            let reloads = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(reloads, mode = ?self.mode(), "cache reloaded");
            return Ok(value);
        }
    }

    pub fn ensure_cached(&self) -> PagingResult<()> {
        if !self.is_cached() {
            self.reload()?;
        }
        Ok(())
    }

    /// Drops the cached value; `AutoWithPrefetch` reloads right away
    /// unless auto refresh is suspended.
    pub fn invalidate(&self) -> PagingResult<()> {
        self.drop_cached();
        let prefetch = self.mode() == CacheMode::AutoWithPrefetch && !self.is_suspended();
        debug!(prefetch, "cache invalidated");
        if prefetch {
            self.reload()?;
        }
        Ok(())
    }

    /// Drops the cached value without prefetch, whatever the mode is.
    pub fn uncache(&self) {
        self.drop_cached();
        debug!("cache uncached");
    }

    fn drop_cached(&self) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        self.cached.store(None);
    }

    /// Holds prefetch-on-invalidate off until the guard is released.
    /// Releasing the last guard reloads once.
    pub fn suspend_auto_refresh(&self) -> SuspendGuard<'_, T> {
        let depth = self.suspend_depth.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(depth, "auto refresh suspended");
        SuspendGuard {
            owner: self,
            released: false,
        }
    }

    fn release_suspend(&self) -> PagingResult<()> {
        let previous = self.suspend_depth.fetch_sub(1, Ordering::AcqRel);
        debug!(depth = previous - 1, "auto refresh suspend released");
        if previous == 1 {
            self.reload()?;
        }
        Ok(())
    }

    // State

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

    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            mode: self.mode(),
            is_cached: self.is_cached(),
            suspend_depth: self.suspend_depth(),
            reloads: self.reloads(),
        }
    }
}

impl<T> fmt::Debug for CacheBox<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBox")
            .field("mode", &self.mode())
            .field("is_cached", &self.is_cached())
            .field("suspend_depth", &self.suspend_depth())
            .field("reloads", &self.reloads())
            .finish()
    }
}

// SuspendGuard

/// Scope of suspended auto refresh. Released on drop; use [`SuspendGuard::release`]
/// to observe the resync error instead of having it logged.
#[must_use = "auto refresh resumes as soon as the guard is dropped"]
pub struct SuspendGuard<'a, T>
where
    T: Send + Sync + 'static,
{
    owner: &'a CacheBox<T>,
    released: bool,
}

impl<T> SuspendGuard<'_, T>
where
    T: Send + Sync + 'static,
{
    pub fn release(mut self) -> PagingResult<()> {
        self.released = true;
        self.owner.release_suspend()
    }
}

impl<T> Drop for SuspendGuard<'_, T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.owner.release_suspend() {
            warn!(error = %err, "reload after suspended auto refresh failed, cache left empty");
        }
    }
}

// Builder

pub struct CacheBoxBuilder<T>
where
    T: Send + Sync + 'static,
{
    fetch: Option<Fetcher<T>>,
    transform: Option<Transformer<T>>,
    mode: CacheMode,
}

impl<T> CacheBoxBuilder<T>
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

    pub fn fetch<F>(mut self, fetch: F) -> Self
    where
        F: Fn() -> FetchResult<T> + Send + Sync + 'static,
    {
        self.fetch = Some(Arc::new(fetch));
        self
    }

    pub fn fetcher(mut self, fetch: Fetcher<T>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn transform<M>(mut self, transform: M) -> Self
    where
        M: Fn(T) -> FetchResult<T> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builds an invalidated box: `AutoWithPrefetch` loads once here.
    pub fn build(self) -> PagingResult<CacheBox<T>> {
        let fetch = self.fetch
            .ok_or(PagingError::invalid_argument("fetch", "fetch callback is required"))?;
        let cache = CacheBox {
            fetch,
            transform: self.transform,
            cached: ArcSwapOption::empty(),
            epoch: Mutex::new(0),
            mode: AtomicU8::new(self.mode.to_u8()),
            suspend_depth: AtomicUsize::new(0),
            reloads: AtomicU64::new(0),
        };
        cache.invalidate()?;
        Ok(cache)
    }
}

impl<T> Default for CacheBoxBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::errors::SourceError;

    fn counting(calls: Arc<AtomicUsize>) -> impl Fn() -> FetchResult<usize> + Send + Sync + 'static {
        move || Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[test]
    fn test_builder_requires_fetch() {
        let result = CacheBox::<usize>::builder().mode(CacheMode::Auto).build();
        assert!(matches!(result, Err(PagingError::InvalidArgument { name: "fetch", .. })));
    }

    #[test]
    fn test_manual_never_stores() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CacheBox::new(counting(Arc::clone(&calls)), CacheMode::Manual).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*cache.value().unwrap(), 1);
        assert_eq!(*cache.value().unwrap(), 2);
        assert!(!cache.is_cached());
        assert_eq!(cache.reloads(), 0);
    }

    #[test]
    fn test_manual_after_explicit_reload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CacheBox::new(counting(Arc::clone(&calls)), CacheMode::Manual).unwrap();
        cache.ensure_cached().unwrap();
        assert_eq!(*cache.value().unwrap(), 1);
        assert_eq!(*cache.value().unwrap(), 1);
        cache.ensure_cached().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_auto_caches_first_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CacheBox::new(counting(Arc::clone(&calls)), CacheMode::Auto).unwrap();
        assert!(!cache.is_cached());
        let first = cache.value().unwrap();
        let second = cache.value().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prefetch_loads_on_build_and_invalidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CacheBox::new(counting(Arc::clone(&calls)), CacheMode::AutoWithPrefetch).unwrap();
        assert!(cache.is_cached());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        cache.invalidate().unwrap();
        assert!(cache.is_cached());
        assert_eq!(*cache.peek().unwrap(), 2);
    }

    #[test]
    fn test_uncache_skips_prefetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CacheBox::new(counting(Arc::clone(&calls)), CacheMode::AutoWithPrefetch).unwrap();
        cache.uncache();
        assert!(!cache.is_cached());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transform_applied_on_reload_only() {
        let cache = CacheBox::with_transform(|| Ok(10usize), |v| Ok(v * 2), CacheMode::Manual).unwrap();
        assert_eq!(*cache.value().unwrap(), 10);
        assert_eq!(*cache.reload().unwrap(), 20);
        assert_eq!(*cache.value().unwrap(), 20);
    }

    #[test]
    fn test_failed_reload_leaves_uncached() {
        let fail = Arc::new(AtomicUsize::new(0));
        let fail_clone = Arc::clone(&fail);
        let cache = CacheBox::new(move || {
            if fail_clone.load(Ordering::SeqCst) == 1 {
                Err(SourceError::msg("fetch", "unavailable"))
            } else {
                Ok(7usize)
            }
        }, CacheMode::Auto).unwrap();
        cache.ensure_cached().unwrap();
        fail.store(1, Ordering::SeqCst);
        assert!(cache.reload().unwrap_err().is_source());
        assert!(!cache.is_cached());
        fail.store(0, Ordering::SeqCst);
        assert_eq!(*cache.value().unwrap(), 7);
    }

    #[test]
    fn test_nested_suspend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = CacheBox::new(counting(Arc::clone(&calls)), CacheMode::AutoWithPrefetch).unwrap();
        {
            let _outer = cache.suspend_auto_refresh();
            {
                let _inner = cache.suspend_auto_refresh();
                cache.invalidate().unwrap();
                assert_eq!(cache.suspend_depth(), 2);
            }
            assert_eq!(cache.suspend_depth(), 1);
            assert!(!cache.is_cached());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
        assert_eq!(cache.suspend_depth(), 0);
        assert!(cache.is_cached());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_during_fetch_refetches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache: Arc<std::sync::OnceLock<CacheBox<usize>>> = Arc::new(std::sync::OnceLock::new());
        let calls_clone = Arc::clone(&calls);
        let cache_clone = Arc::clone(&cache);
        let built = CacheBox::new(move || {
            let call = calls_clone.fetch_add(1, Ordering::SeqCst) + 1;
            // первый fetch видит инвалидацию посреди работы
            if call == 1 {
                if let Some(cache) = cache_clone.get() {
                    cache.uncache();
                }
            }
            Ok(call)
        }, CacheMode::Auto).unwrap();
        assert!(cache.set(built).is_ok());
        let cache = cache.get().unwrap();

        assert_eq!(*cache.value().unwrap(), 2);
        assert_eq!(*cache.peek().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.reloads(), 1);
    }

    #[test]
    fn test_mode_roundtrip() {
        let cache = CacheBox::new(|| Ok(1u8), CacheMode::Manual).unwrap();
        cache.set_mode(CacheMode::AutoWithPrefetch);
        assert_eq!(cache.mode(), CacheMode::AutoWithPrefetch);
        let stats = cache.stats();
        assert_eq!(stats.mode, CacheMode::AutoWithPrefetch);
        assert!(!stats.is_suspended());
    }
}
