//! Fakes and builders shared by the unit tests of this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_stat_models::{
    Episode, EpisodeRecord, LocationType, Movie, MovieStatistics, ProviderIds, Season, Show,
    Statistic, StatisticKind, StatisticPayload, ShowStatistics,
};
use media_stat_sources::emby::{item_types, BaseItem, ItemQuery, QueryResult};
use media_stat_sources::{MediaServerClient, MetadataProvider, SourceError, SourceResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use crate::context::{LogLevel, SyncEvent, EventSink};

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self, level: LogLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::Log { level: l, message } if l == level => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Option<bool> {
        self.events().into_iter().find_map(|e| match e {
            SyncEvent::Finished { success } => Some(success),
            _ => None,
        })
    }
}

/// Media server answering queries from a flat list of items linked by `parent_id`
#[derive(Default)]
pub struct FakeMediaServer {
    pub root_folders: Vec<BaseItem>,
    pub items: Vec<BaseItem>,
    pub identity: Option<String>,
    /// Parent ids whose queries fail
    pub failing_parents: HashSet<String>,
    /// Cancel this token once `cancel_after` item queries have been answered
    pub cancel: Option<(CancellationToken, usize)>,
    pub queries: Mutex<Vec<ItemQuery>>,
    calls: AtomicUsize,
}

impl FakeMediaServer {
    pub fn new(root_folders: Vec<BaseItem>, items: Vec<BaseItem>) -> Self {
        Self {
            root_folders,
            items,
            identity: Some("Emby Server".to_string()),
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn is_descendant(&self, item: &BaseItem, ancestor: &str, recursive: bool) -> bool {
        let mut parent = item.parent_id.clone();
        let mut depth = 0;
        while let Some(id) = parent {
            if id == ancestor {
                return true;
            }
            if !recursive || depth > 16 {
                return false;
            }
            parent = self
                .items
                .iter()
                .chain(self.root_folders.iter())
                .find(|i| i.id == id)
                .and_then(|i| i.parent_id.clone());
            depth += 1;
        }
        false
    }
}

#[async_trait]
impl MediaServerClient for FakeMediaServer {
    async fn get_items(&self, query: &ItemQuery) -> SourceResult<QueryResult> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(parent) = &query.parent_id {
            if self.failing_parents.contains(parent) {
                return Err(SourceError::Http { status: 500, url: format!("/items/{}", parent) });
            }
        }

        let matching: Vec<BaseItem> = self
            .items
            .iter()
            .filter(|item| match &query.parent_id {
                Some(parent) => self.is_descendant(item, parent, query.recursive),
                None => true,
            })
            .filter(|item| {
                query.include_item_types.is_empty()
                    || query.include_item_types.iter().any(|t| item.is_type(t))
            })
            .cloned()
            .collect();

        let total = matching.len() as u32;
        let start = query.start_index.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let items = matching.into_iter().skip(start).take(limit).collect();

        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((token, after)) = &self.cancel {
            if calls >= *after {
                token.cancel();
            }
        }

        Ok(QueryResult { items, total_record_count: total })
    }

    async fn get_root_folders(&self) -> SourceResult<Vec<BaseItem>> {
        Ok(self.root_folders.clone())
    }

    async fn ping(&self) -> SourceResult<String> {
        self.identity
            .clone()
            .ok_or_else(|| SourceError::Transport("connection refused".to_string()))
    }
}

/// Metadata provider serving canned episode lists
#[derive(Default)]
pub struct FakeProvider {
    pub episodes: HashMap<String, Vec<EpisodeRecord>>,
    pub not_found: HashSet<String>,
    pub failing: HashSet<String>,
    pub changed: Vec<String>,
    pub reject_login: bool,
    pub logins: Mutex<Vec<String>>,
    pub episode_requests: Mutex<Vec<String>>,
    pub changed_since: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeProvider {
    pub fn with_episodes(mut self, external_id: &str, records: Vec<EpisodeRecord>) -> Self {
        self.episodes.insert(external_id.to_string(), records);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.episode_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn login(&self, api_key: &str) -> SourceResult<String> {
        self.logins.lock().unwrap().push(api_key.to_string());
        if self.reject_login {
            return Err(SourceError::Unauthorized("/login".to_string()));
        }
        Ok("token".to_string())
    }

    async fn get_episodes(&self, external_show_id: &str) -> SourceResult<Vec<EpisodeRecord>> {
        self.episode_requests.lock().unwrap().push(external_show_id.to_string());
        if self.not_found.contains(external_show_id) {
            return Err(SourceError::NotFound(format!("/series/{}/episodes", external_show_id)));
        }
        if self.failing.contains(external_show_id) {
            return Err(SourceError::Http {
                status: 503,
                url: format!("/series/{}/episodes", external_show_id),
            });
        }
        Ok(self.episodes.get(external_show_id).cloned().unwrap_or_default())
    }

    async fn get_changed_shows(
        &self,
        external_ids: &[String],
        since: DateTime<Utc>,
    ) -> SourceResult<Vec<String>> {
        self.changed_since.lock().unwrap().push(since);
        Ok(self
            .changed
            .iter()
            .filter(|id| external_ids.contains(id))
            .cloned()
            .collect())
    }
}

// Server items

pub fn library_item(id: &str, collection_type: Option<&str>) -> BaseItem {
    BaseItem {
        id: id.to_string(),
        name: format!("Library {}", id),
        item_type: Some("CollectionFolder".to_string()),
        collection_type: collection_type.map(str::to_string),
        ..BaseItem::default()
    }
}

pub fn movie_item(id: &str, parent: &str) -> BaseItem {
    BaseItem {
        id: id.to_string(),
        name: format!("Movie {}", id),
        item_type: Some(item_types::MOVIE.to_string()),
        parent_id: Some(parent.to_string()),
        run_time_ticks: Some(60 * media_stat_models::TICKS_PER_MINUTE),
        ..BaseItem::default()
    }
}

pub fn box_set_item(id: &str, parent: &str) -> BaseItem {
    BaseItem {
        id: id.to_string(),
        name: format!("Collection {}", id),
        item_type: Some(item_types::BOX_SET.to_string()),
        parent_id: Some(parent.to_string()),
        ..BaseItem::default()
    }
}

pub fn series_item(id: &str, parent: &str, tvdb: Option<&str>) -> BaseItem {
    let mut provider_ids = HashMap::new();
    if let Some(tvdb) = tvdb {
        provider_ids.insert("Tvdb".to_string(), tvdb.to_string());
    }
    BaseItem {
        id: id.to_string(),
        name: format!("Series {}", id),
        item_type: Some(item_types::SERIES.to_string()),
        parent_id: Some(parent.to_string()),
        provider_ids,
        ..BaseItem::default()
    }
}

pub fn season_item(id: &str, series: &str, index: i32) -> BaseItem {
    BaseItem {
        id: id.to_string(),
        name: format!("Season {}", index),
        item_type: Some(item_types::SEASON.to_string()),
        parent_id: Some(series.to_string()),
        series_id: Some(series.to_string()),
        index_number: Some(index),
        ..BaseItem::default()
    }
}

pub fn episode_item(id: &str, series: &str, season: &str, index: i32, runtime: Option<i64>) -> BaseItem {
    BaseItem {
        id: id.to_string(),
        name: format!("Episode {}", index),
        item_type: Some(item_types::EPISODE.to_string()),
        parent_id: Some(season.to_string()),
        series_id: Some(series.to_string()),
        season_id: Some(season.to_string()),
        index_number: Some(index),
        run_time_ticks: runtime,
        ..BaseItem::default()
    }
}

// Catalog rows

pub fn movie(id: &str, library_id: &str) -> Movie {
    Movie {
        id: id.to_string(),
        library_id: library_id.to_string(),
        name: format!("Movie {}", id),
        original_title: None,
        sort_name: None,
        production_year: None,
        premiere_date: None,
        date_created: None,
        community_rating: None,
        official_rating: None,
        genres: Vec::new(),
        provider_ids: ProviderIds::default(),
        run_time_ticks: None,
        path: None,
        media_streams: Vec::new(),
    }
}

pub fn show(id: &str, library_id: &str, tvdb: Option<&str>) -> Show {
    Show {
        id: id.to_string(),
        library_id: library_id.to_string(),
        name: format!("Show {}", id),
        sort_name: None,
        production_year: None,
        premiere_date: None,
        community_rating: None,
        official_rating: None,
        status: None,
        genres: Vec::new(),
        provider_ids: ProviderIds {
            tvdb: tvdb.map(str::to_string),
            ..ProviderIds::default()
        },
        path: None,
        cumulative_run_time_ticks: 0,
        metadata_synced: false,
        metadata_failed: false,
        seasons: Vec::new(),
        episodes: Vec::new(),
    }
}

pub fn season(show_id: &str, id: &str, index: i32) -> Season {
    Season {
        id: id.to_string(),
        show_id: show_id.to_string(),
        name: format!("Season {}", index),
        index_number: Some(index),
        location_type: LocationType::Disk,
    }
}

pub fn disk_episode(show_id: &str, season_id: &str, id: &str, index: i32, end: Option<i32>) -> Episode {
    Episode {
        id: id.to_string(),
        show_id: show_id.to_string(),
        season_id: season_id.to_string(),
        name: format!("Episode {}", index),
        index_number: Some(index),
        index_number_end: end,
        run_time_ticks: None,
        premiere_date: None,
        provider_ids: ProviderIds::default(),
        location_type: LocationType::Disk,
    }
}

pub fn record(id: &str, season: i32, episode: i32, first_aired: Option<&str>) -> EpisodeRecord {
    EpisodeRecord {
        id: id.to_string(),
        episode_number: episode,
        season_number: season,
        name: Some(format!("S{:02}E{:02}", season, episode)),
        first_aired: first_aired.map(str::to_string),
    }
}

pub fn statistic(kind: StatisticKind, ids: &[&str]) -> Statistic {
    let payload = match kind {
        StatisticKind::Movie => StatisticPayload::Movie(MovieStatistics::default()),
        StatisticKind::Show => StatisticPayload::Show(ShowStatistics::default()),
    };
    Statistic {
        kind,
        collection_ids: ids.iter().map(|s| s.to_string()).collect(),
        calculated_at: Utc::now(),
        payload,
    }
}
