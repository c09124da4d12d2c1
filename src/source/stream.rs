use super::{AsyncPageSource, PageBounds, PageSnapshot};
use crate::{
    errors::SourceError,
    result::FetchResult,
};
use async_trait::async_trait;
use futures::{
    StreamExt,
    TryStreamExt,
    stream::BoxStream,
};
use std::{marker::PhantomData, sync::Arc};

// StreamSource - асинхронная последовательность, заданная фабрикой потоков.
// Каждый вызов count/slice открывает поток заново.
pub struct StreamSource<T, F>
where
    T: Send + Sync + 'static,
{
    factory: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> StreamSource<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> BoxStream<'static, FetchResult<T>> + Send + Sync + 'static,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> AsyncPageSource for StreamSource<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> BoxStream<'static, FetchResult<T>> + Send + Sync + 'static,
{
    type Item = T;
    type Window = PageSnapshot<T>;

    async fn count(&self) -> FetchResult<usize> {
        (self.factory)()
            .try_fold(0usize, |count, _| async move { Ok::<_, SourceError>(count + 1) })
            .await
    }

    // Ошибка в пропускаемом префиксе прерывает выборку, как и в count
    async fn slice(&self, bounds: PageBounds) -> FetchResult<PageSnapshot<T>> {
        let mut rows = (self.factory)();
        for _ in 0..bounds.skip {
            if rows.try_next().await?.is_none() {
                return Ok(Vec::new().into());
            }
        }
        let items: Vec<Arc<T>> = rows
            .take(bounds.take)
            .map_ok(Arc::new)
            .try_collect()
            .await?;
        Ok(items.into())
    }

    async fn materialize(&self, window: PageSnapshot<T>) -> FetchResult<PageSnapshot<T>> {
        Ok(window)
    }

    async fn items(&self, window: &PageSnapshot<T>) -> FetchResult<Vec<Arc<T>>> {
        Ok(window.to_vec())
    }
}
