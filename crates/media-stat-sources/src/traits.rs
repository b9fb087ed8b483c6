use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_stat_models::EpisodeRecord;
use crate::emby::{BaseItem, ItemQuery, QueryResult};
use crate::error::SourceResult;

/// Remote media server holding the catalog (Emby/Jellyfin)
#[async_trait]
pub trait MediaServerClient: Send + Sync {
    /// Query items under a parent, optionally paged
    async fn get_items(&self, query: &ItemQuery) -> SourceResult<QueryResult>;

    /// Root folders (libraries) visible to the configured user
    async fn get_root_folders(&self) -> SourceResult<Vec<BaseItem>>;

    /// Identity string reported by the server's ping endpoint
    async fn ping(&self) -> SourceResult<String>;
}

/// External episode metadata provider (TheTVDB)
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Exchange the API key for a session token, kept by the client for later calls
    async fn login(&self, api_key: &str) -> SourceResult<String>;

    /// Every episode the provider knows for a show
    async fn get_episodes(&self, external_show_id: &str) -> SourceResult<Vec<EpisodeRecord>>;

    /// Subset of `external_ids` updated on the provider since `since`
    async fn get_changed_shows(
        &self,
        external_ids: &[String],
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<String>>;
}
