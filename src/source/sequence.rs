use super::{PageBounds, PageSlice, PageSource};
use crate::result::FetchResult;
use rayon::prelude::*;
use std::sync::Arc;

const PARALLEL_MATERIALIZE_THRESHOLD: usize = 100_000;

// SequenceSource - Zero-Copy in-memory источник
//
// Элементы хранятся как Arc<T>: окно страницы - это диапазон над общим Vec,
// materialize копирует только ссылки.
pub struct SequenceSource<T>
where
    T: Send + Sync + 'static,
{
    items: Arc<Vec<Arc<T>>>,
}

impl<T> SequenceSource<T>
where
    T: Send + Sync + 'static,
{
    pub fn from_vec(items: Vec<T>) -> Self {
        let len = items.len();
        let arc_items = match len {
            0..=499 => {
                items.into_iter().map(Arc::new).collect()
            }
            500..=50_000 => {
                let mut arcs = Vec::with_capacity(len);
                arcs.par_extend(items.into_par_iter().map(Arc::new));
                arcs
            }
            _ => {
                items
                    .into_par_iter()
                    .with_min_len(10_000)
                    .map(Arc::new)
                    .collect()
            }
        };
        Self {
            items: Arc::new(arc_items),
        }
    }

    pub fn from_vec_arc_value(items: Vec<Arc<T>>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn from_shared(items: Arc<Vec<Arc<T>>>) -> Self {
        Self { items }
    }

    pub fn shared(&self) -> Arc<Vec<Arc<T>>> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> PageSource for SequenceSource<T>
where
    T: Send + Sync + 'static,
{
    type Item = T;
    type Window = PageSlice<T>;

    fn count(&self) -> FetchResult<usize> {
        Ok(self.items.len())
    }

    fn slice(&self, bounds: PageBounds) -> FetchResult<PageSlice<T>> {
        Ok(PageSlice::View {
            source: Arc::clone(&self.items),
            range: bounds.clamp_to(self.items.len()),
        })
    }

    fn materialize(&self, window: PageSlice<T>) -> FetchResult<PageSlice<T>> {
        match window {
            PageSlice::View { source, range } => {
                let items: Vec<Arc<T>> = if range.len() > PARALLEL_MATERIALIZE_THRESHOLD {
                    source[range].par_iter().cloned().collect()
                } else {
                    source[range].to_vec()
                };
                Ok(PageSlice::Snapshot(items.into()))
            }
            snapshot @ PageSlice::Snapshot(_) => Ok(snapshot),
        }
    }

    fn items(&self, window: &PageSlice<T>) -> FetchResult<Vec<Arc<T>>> {
        Ok(window.to_vec())
    }
}

impl<T> From<Vec<T>> for SequenceSource<T>
where
    T: Send + Sync + 'static,
{
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}
