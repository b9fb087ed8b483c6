use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::ProviderIds;

/// Whether an episode exists on disk or was synthesized from external metadata
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationType {
    Disk,
    Virtual,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Show {
    pub id: String,
    pub library_id: String,
    pub name: String,
    pub sort_name: Option<String>,
    pub production_year: Option<i32>,
    pub premiere_date: Option<DateTime<Utc>>,
    pub community_rating: Option<f32>,
    pub official_rating: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub provider_ids: ProviderIds,
    pub path: Option<String>,
    /// Sum of the run time of every ingested episode
    pub cumulative_run_time_ticks: i64,
    pub metadata_synced: bool,
    pub metadata_failed: bool,
    pub seasons: Vec<Season>,
    pub episodes: Vec<Episode>,
}

impl Show {
    /// Identifier used against the external metadata provider
    pub fn external_id(&self) -> Option<&str> {
        self.provider_ids
            .tvdb
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn season_by_index(&self, index_number: i32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.index_number == Some(index_number))
    }

    pub fn episodes_in_season<'a>(&'a self, season_id: &'a str) -> impl Iterator<Item = &'a Episode> + 'a {
        self.episodes.iter().filter(move |e| e.season_id == season_id)
    }

    pub fn disk_episodes(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.iter().filter(|e| e.location_type == LocationType::Disk)
    }

    pub fn missing_episode_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.location_type == LocationType::Virtual).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    pub id: String,
    pub show_id: String,
    pub name: String,
    pub index_number: Option<i32>,
    pub location_type: LocationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: String,
    pub show_id: String,
    pub season_id: String,
    pub name: String,
    pub index_number: Option<i32>,
    /// Last episode number for files spanning several episodes
    pub index_number_end: Option<i32>,
    pub run_time_ticks: Option<i64>,
    pub premiere_date: Option<DateTime<Utc>>,
    pub provider_ids: ProviderIds,
    pub location_type: LocationType,
}

impl Episode {
    /// True when this episode (or the span it covers) includes `episode_number`.
    pub fn covers(&self, episode_number: i32) -> bool {
        match (self.index_number, self.index_number_end) {
            (Some(start), None) => start == episode_number,
            (Some(start), Some(end)) => start <= episode_number && episode_number <= end,
            (None, _) => false,
        }
    }
}
