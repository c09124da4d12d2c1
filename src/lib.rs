pub mod errors;
pub mod result;
pub mod model;
pub mod options;
pub mod cache;
pub mod source;
pub mod view;
pub mod async_view;
pub mod pager;

pub use cache::{
    CacheBox,
    CacheMode,
    SuspendGuard,
};
pub use errors::{
    PagingError,
    SourceError,
};
pub use source::{
    AsyncPageSource,
    PageBounds,
    PageSlice,
    PageSnapshot,
    PageSource,
    iter::IterSource,
    query::{
        MemoryQuery,
        QueryPage,
        QuerySource,
        Queryable,
    },
    sequence::SequenceSource,
    stream::StreamSource,
};
pub use view::{IntoPaginatedView, PaginatedView};
pub use async_view::{AsyncCacheBox, AsyncPaginatedView};
pub use options::{LinkVisibility, PagerOptions, PagingOptions};
pub use pager::{Pager, PagerItem};
pub use model::{CacheStats, PageInfo};
pub use result::{FetchResult, PagingResult};
