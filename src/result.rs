use super::errors::{
    PagingError,
    SourceError,
};

pub type PagingResult<T> = Result<T,PagingError>;
pub type FetchResult<T> = Result<T,SourceError>;
