use media_stat_models::EpisodeRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub apikey: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Links {
    pub next: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EpisodeData {
    pub id: u64,
    pub aired_episode_number: Option<i32>,
    pub aired_season: Option<i32>,
    pub first_aired: Option<String>,
    pub episode_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EpisodesPage {
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub data: Vec<EpisodeData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatedSeries {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdatedPage {
    /// The provider sends `null` when nothing changed in the window
    pub data: Option<Vec<UpdatedSeries>>,
}

impl EpisodeData {
    /// Episodes without a season or number cannot be placed and are dropped
    pub fn into_record(self) -> Option<EpisodeRecord> {
        Some(EpisodeRecord {
            id: self.id.to_string(),
            episode_number: self.aired_episode_number?,
            season_number: self.aired_season?,
            name: self.episode_name,
            first_aired: self.first_aired,
        })
    }
}
