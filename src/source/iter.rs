use super::{PageBounds, PageSnapshot, PageSource};
use crate::result::FetchResult;
use std::{marker::PhantomData, sync::Arc};

// IterSource - любой перечисляемый источник, заданный фабрикой итераторов.
// count перечисляет всё, slice делает skip + take, окно сразу собрано.
pub struct IterSource<T, F>
where
    T: Send + Sync + 'static,
{
    factory: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F, I> IterSource<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> I + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _phantom: PhantomData,
        }
    }
}

impl<T, F, I> PageSource for IterSource<T, F>
where
    T: Send + Sync + 'static,
    F: Fn() -> I + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    type Item = T;
    type Window = PageSnapshot<T>;

    fn count(&self) -> FetchResult<usize> {
        Ok((self.factory)().into_iter().count())
    }

    fn slice(&self, bounds: PageBounds) -> FetchResult<PageSnapshot<T>> {
        let items: Vec<Arc<T>> = (self.factory)()
            .into_iter()
            .skip(bounds.skip)
            .take(bounds.take)
            .map(Arc::new)
            .collect();
        Ok(items.into())
    }

    fn materialize(&self, window: PageSnapshot<T>) -> FetchResult<PageSnapshot<T>> {
        Ok(window)
    }

    fn items(&self, window: &PageSnapshot<T>) -> FetchResult<Vec<Arc<T>>> {
        Ok(window.to_vec())
    }
}
