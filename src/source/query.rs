//! Query-backed sources.
//!
//! A [`Queryable`] is a composable query expression executed by some backend.
//! [`QuerySource`] appends count and skip/take operators to the *original*
//! expression for every page, so each page fetch can be pushed down to the
//! store instead of being cut from a previously loaded page.

use super::{PageBounds, PageSource};
use crate::result::FetchResult;
use std::{fmt, sync::Arc};

pub trait Queryable: Clone + Send + Sync + 'static {
    type Item: Send + Sync + 'static;

    /// New expression with a skip operator appended.
    fn skip(&self, count: usize) -> Self;

    /// New expression with a take operator appended.
    fn take(&self, count: usize) -> Self;

    /// Executes the expression with a count operator appended.
    fn count(&self) -> FetchResult<usize>;

    /// Executes the expression and returns its rows.
    fn execute(&self) -> FetchResult<Vec<Self::Item>>;
}

pub enum QueryPage<Q>
where
    Q: Queryable,
{
    // выражение страницы, ещё не выполнено
    Deferred(Q),
    // результат выполнения, буферизован локально
    Buffered(Arc<[Arc<Q::Item>]>),
}

impl<Q> QueryPage<Q>
where
    Q: Queryable,
{
    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered(_))
    }

    pub fn query(&self) -> Option<&Q> {
        match self {
            Self::Deferred(query) => Some(query),
            Self::Buffered(_) => None,
        }
    }

    pub fn buffered(&self) -> Option<&[Arc<Q::Item>]> {
        match self {
            Self::Deferred(_) => None,
            Self::Buffered(items) => Some(items),
        }
    }
}

impl<Q> fmt::Debug for QueryPage<Q>
where
    Q: Queryable + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred(query) => f.debug_tuple("Deferred").field(query).finish(),
            Self::Buffered(items) => f.debug_tuple("Buffered").field(&items.len()).finish(),
        }
    }
}

pub struct QuerySource<Q>
where
    Q: Queryable,
{
    query: Q,
}

impl<Q> QuerySource<Q>
where
    Q: Queryable,
{
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    fn buffer(query: &Q) -> FetchResult<Arc<[Arc<Q::Item>]>> {
        let rows = query.execute()?;
        Ok(rows.into_iter().map(Arc::new).collect::<Vec<_>>().into())
    }
}

impl<Q> PageSource for QuerySource<Q>
where
    Q: Queryable,
{
    type Item = Q::Item;
    type Window = QueryPage<Q>;

    fn count(&self) -> FetchResult<usize> {
        self.query.count()
    }

    fn slice(&self, bounds: PageBounds) -> FetchResult<QueryPage<Q>> {
        Ok(QueryPage::Deferred(self.query.skip(bounds.skip).take(bounds.take)))
    }

    fn materialize(&self, window: QueryPage<Q>) -> FetchResult<QueryPage<Q>> {
        match window {
            QueryPage::Deferred(query) => Ok(QueryPage::Buffered(Self::buffer(&query)?)),
            buffered @ QueryPage::Buffered(_) => Ok(buffered),
        }
    }

    fn items(&self, window: &QueryPage<Q>) -> FetchResult<Vec<Arc<Q::Item>>> {
        match window {
            QueryPage::Deferred(query) => Ok(Self::buffer(query)?.to_vec()),
            QueryPage::Buffered(items) => Ok(items.to_vec()),
        }
    }
}

// MemoryQuery - выражение над данными в памяти.
// Операторы накапливаются и применяются по порядку при выполнении.

pub type QueryPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub enum QueryOp<T> {
    Filter(QueryPredicate<T>),
    Skip(usize),
    Take(usize),
}

impl<T> Clone for QueryOp<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Filter(predicate) => Self::Filter(Arc::clone(predicate)),
            Self::Skip(count) => Self::Skip(*count),
            Self::Take(count) => Self::Take(*count),
        }
    }
}

impl<T> fmt::Display for QueryOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(_) => write!(f, "filter"),
            Self::Skip(count) => write!(f, "skip({count})"),
            Self::Take(count) => write!(f, "take({count})"),
        }
    }
}

pub struct MemoryQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    data: Arc<Vec<T>>,
    ops: Vec<QueryOp<T>>,
}

impl<T> MemoryQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data: Arc::new(data),
            ops: Vec::new(),
        }
    }

    pub fn from_shared(data: Arc<Vec<T>>) -> Self {
        Self {
            data,
            ops: Vec::new(),
        }
    }

    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.with_op(QueryOp::Filter(Arc::new(predicate)))
    }

    pub fn ops(&self) -> &[QueryOp<T>] {
        &self.ops
    }

    /// Operators joined in application order, e.g. `filter -> skip(10) -> take(10)`.
    pub fn expression(&self) -> String {
        if self.ops.is_empty() {
            return "source".to_string();
        }
        self.ops
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn with_op(&self, op: QueryOp<T>) -> Self {
        let mut ops = Vec::with_capacity(self.ops.len() + 1);
        ops.extend_from_slice(&self.ops);
        ops.push(op);
        Self {
            data: Arc::clone(&self.data),
            ops,
        }
    }

    fn run(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self.data.iter().collect();
        for op in &self.ops {
            rows = match op {
                QueryOp::Filter(predicate) => rows.into_iter().filter(|row| predicate(*row)).collect(),
                QueryOp::Skip(count) => rows.into_iter().skip(*count).collect(),
                QueryOp::Take(count) => rows.into_iter().take(*count).collect(),
            };
        }
        rows
    }
}

impl<T> Clone for MemoryQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            ops: self.ops.clone(),
        }
    }
}

impl<T> fmt::Debug for MemoryQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("rows", &self.data.len())
            .field("expression", &self.expression())
            .finish()
    }
}

impl<T> Queryable for MemoryQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn skip(&self, count: usize) -> Self {
        self.with_op(QueryOp::Skip(count))
    }

    fn take(&self, count: usize) -> Self {
        self.with_op(QueryOp::Take(count))
    }

    fn count(&self) -> FetchResult<usize> {
        Ok(self.run().len())
    }

    fn execute(&self) -> FetchResult<Vec<T>> {
        Ok(self.run().into_iter().cloned().collect())
    }
}
