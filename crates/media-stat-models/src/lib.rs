pub mod library;
pub mod movie;
pub mod show;
pub mod statistic;
pub mod episode_record;

pub use library::{Library, LibraryType};
pub use movie::{MediaStream, Movie, ProviderIds, StreamType};
pub use show::{Episode, LocationType, Season, Show};
pub use statistic::{
    GenreCount, MovieStatistics, MovieSummary, ShowStatistics, Statistic, StatisticKind,
    StatisticPayload,
};
pub use episode_record::EpisodeRecord;

/// Emby/Jellyfin express durations in ticks of 100ns.
pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const TICKS_PER_MINUTE: i64 = TICKS_PER_SECOND * 60;
