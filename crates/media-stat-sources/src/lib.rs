pub mod traits;
pub mod error;
pub mod emby;
pub mod tvdb;

pub use traits::{MediaServerClient, MetadataProvider};
pub use error::{SourceError, SourceResult};
pub use emby::{BaseItem, EmbyClient, ItemQuery, QueryResult};
pub use tvdb::TvdbClient;
