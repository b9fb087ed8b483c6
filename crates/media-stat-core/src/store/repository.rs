use chrono::{DateTime, Utc};
use media_stat_models::{Episode, Library, Movie, Season, Show, Statistic, StatisticKind};
use std::collections::BTreeSet;
use crate::error::StoreResult;

// Library filters: an empty `library_ids` slice means "every library".

pub trait LibraryRepository: Send + Sync {
    /// Delete every library and insert `libraries`
    fn replace_libraries(&self, libraries: &[Library]) -> StoreResult<()>;
    fn libraries(&self) -> StoreResult<Vec<Library>>;
}

pub trait MovieRepository: Send + Sync {
    fn remove_movies(&self) -> StoreResult<()>;
    /// Insert or overwrite by id
    fn upsert_movies(&self, movies: &[Movie]) -> StoreResult<()>;
    fn movie_by_id(&self, id: &str) -> StoreResult<Option<Movie>>;
    fn movies(&self, library_ids: &[String]) -> StoreResult<Vec<Movie>>;
}

pub trait ShowRepository: Send + Sync {
    /// Delete every show, season and episode
    fn remove_shows(&self) -> StoreResult<()>;
    fn insert_show(&self, show: &Show) -> StoreResult<()>;
    fn insert_seasons(&self, seasons: &[Season]) -> StoreResult<()>;
    /// Fails when an episode's season has not been inserted
    fn insert_episodes(&self, episodes: &[Episode]) -> StoreResult<()>;
    /// Overwrite the show row; seasons and episodes are stored separately
    fn update_show(&self, show: &Show) -> StoreResult<()>;
    fn show_by_id(&self, id: &str) -> StoreResult<Option<Show>>;
    fn season_by_id(&self, id: &str) -> StoreResult<Option<Season>>;
    fn episode_by_id(&self, id: &str) -> StoreResult<Option<Episode>>;
    /// Shows with their seasons and episodes attached
    fn shows(&self, library_ids: &[String]) -> StoreResult<Vec<Show>>;
    /// Shows that carry an external metadata id, with seasons and episodes attached
    fn shows_with_external_id(&self) -> StoreResult<Vec<Show>>;
}

pub trait StatisticsRepository: Send + Sync {
    /// Drop every row of `kind`; returns how many were removed
    fn invalidate_statistics(&self, kind: StatisticKind) -> StoreResult<usize>;
    /// Store a row, replacing one with the same kind and exact library set
    fn insert_statistic(&self, statistic: Statistic) -> StoreResult<()>;
    /// Row computed over exactly `collection_ids` (no superset or subset match)
    fn find_statistic(&self, kind: StatisticKind, collection_ids: &BTreeSet<String>) -> StoreResult<Option<Statistic>>;
    fn statistics(&self, kind: StatisticKind) -> StoreResult<Vec<Statistic>>;
}

/// Timestamp of the last completed metadata reconciliation
pub trait WatermarkRepository: Send + Sync {
    fn last_update(&self) -> StoreResult<Option<DateTime<Utc>>>;
    fn set_last_update(&self, at: Option<DateTime<Utc>>) -> StoreResult<()>;
}
