use std::{
    error::Error as StdError,
    fmt::{self, Debug},
    sync::Arc,
};
use thiserror::Error;

// Ошибка источника данных (адаптер, fetch, transform).
// Arc нужен чтобы ошибка оставалась Clone, как и остальные ошибки крейта.
#[derive(Clone, Error)]
#[error("{context}: {inner}")]
pub struct SourceError {
    context: String,
    #[source]
    inner: Arc<dyn StdError + Send + Sync>,
}

impl SourceError {
    pub fn new<E>(context: impl Into<String>, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            context: context.into(),
            inner: Arc::new(err),
        }
    }

    pub fn msg(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            inner: Arc::new(MessageError(message.into())),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl Debug for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceError")
            .field("context", &self.context)
            .field("inner", &self.inner.to_string())
            .finish()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

#[derive(Debug, Clone, Error)]
pub enum PagingError {
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: String,
    },
    #[error("'{name}' = {value} is out of range {}", describe_range(.min, .max))]
    OutOfRange {
        name: &'static str,
        value: usize,
        min: usize,
        // None когда верхняя граница не проверялась
        max: Option<usize>,
    },
    #[error("paging state changed during enumeration: generation {expected} -> {found}")]
    ConcurrentModification {
        expected: u64,
        found: u64,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
}

fn describe_range(min: &usize, max: &Option<usize>) -> String {
    match max {
        Some(max) => format!("{min}..={max}"),
        None => format!("{min}.."),
    }
}

impl PagingError {
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }

    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
