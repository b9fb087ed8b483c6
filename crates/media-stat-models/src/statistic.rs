use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StatisticKind {
    Movie,
    Show,
}

impl std::fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatisticKind::Movie => write!(f, "movie"),
            StatisticKind::Show => write!(f, "show"),
        }
    }
}

/// Cached statistic computed over an exact set of libraries
///
/// A row answers a lookup only when the requested library set is equal to
/// `collection_ids`; supersets and subsets never match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statistic {
    pub kind: StatisticKind,
    pub collection_ids: BTreeSet<String>,
    pub calculated_at: DateTime<Utc>,
    pub payload: StatisticPayload,
}

impl Statistic {
    pub fn matches(&self, kind: StatisticKind, collection_ids: &BTreeSet<String>) -> bool {
        self.kind == kind && &self.collection_ids == collection_ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StatisticPayload {
    Movie(MovieStatistics),
    Show(ShowStatistics),
}

impl StatisticPayload {
    pub fn kind(&self) -> StatisticKind {
        match self {
            StatisticPayload::Movie(_) => StatisticKind::Movie,
            StatisticPayload::Show(_) => StatisticKind::Show,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: String,
    pub name: String,
    pub community_rating: Option<f32>,
    pub production_year: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MovieStatistics {
    pub movie_count: u64,
    pub total_run_time_ticks: i64,
    pub mean_run_time_minutes: Option<f64>,
    pub mean_community_rating: Option<f64>,
    pub oldest_premiere: Option<MovieSummary>,
    pub newest_premiere: Option<MovieSummary>,
    pub highest_rated: Option<MovieSummary>,
    pub without_imdb_id: u64,
    pub genres: Vec<GenreCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShowStatistics {
    pub show_count: u64,
    pub season_count: u64,
    pub episode_count: u64,
    pub missing_episode_count: u64,
    pub complete_show_count: u64,
    pub metadata_failed_count: u64,
    pub total_run_time_ticks: i64,
    pub genres: Vec<GenreCount>,
}
