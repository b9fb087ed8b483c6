use media_stat_config::SyncSettings;
use media_stat_models::{Episode, Library, LocationType, Season, Show};
use media_stat_sources::emby::{api::SHOW_FIELDS, item_types, BaseItem, ItemQuery, SortOrder};
use media_stat_sources::MediaServerClient;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use crate::context::{ProgressBand, RunContext};
use crate::convert;
use crate::error::{Result, SyncError};
use crate::store::ShowRepository;

const PROGRESS: ProgressBand = ProgressBand::new(35.0, 55.0);

/// Result of a show pass: the catalog as it was before, plus what was ingested
#[derive(Debug, Clone, Default)]
pub struct ShowSyncSummary {
    /// Shows (with seasons and episodes) present before the store was cleared
    pub previous: Vec<Show>,
    pub shows: usize,
    pub episodes: usize,
    /// Virtual episodes kept from the previous pass
    pub carried_episodes: usize,
}

/// Replaces the show, season and episode stores from every show-type library
pub struct ShowSync {
    client: Arc<dyn MediaServerClient>,
    shows: Arc<dyn ShowRepository>,
    settings: SyncSettings,
}

impl ShowSync {
    pub fn new(
        client: Arc<dyn MediaServerClient>,
        shows: Arc<dyn ShowRepository>,
        settings: SyncSettings,
    ) -> Self {
        Self { client, shows, settings }
    }

    #[instrument(skip_all)]
    pub async fn sync(&self, libraries: &[Library], ctx: &RunContext) -> Result<ShowSyncSummary> {
        let previous = self.shows.shows(&[])?;
        self.shows.remove_shows()?;

        let by_id: HashMap<&str, &Show> = previous.iter().map(|s| (s.id.as_str(), s)).collect();

        let targets: Vec<&Library> = libraries
            .iter()
            .filter(|l| self.settings.is_show_library(l.library_type))
            .collect();

        let mut ingested: HashSet<String> = HashSet::new();
        let mut episodes = 0;
        let mut carried = 0;

        for (i, library) in targets.iter().enumerate() {
            ctx.info(format!("Processing shows for library '{}'", library.name));
            ctx.checkpoint()?;
            let query = ItemQuery::under(&library.id)
                .with_types(&[item_types::SERIES])
                .with_fields(SHOW_FIELDS)
                .sorted_by("SortName", SortOrder::Ascending);
            let series = self.client.get_items(&query).await.map_err(SyncError::Fetch)?;

            for item in &series.items {
                if !ingested.insert(item.id.clone()) {
                    debug!("Series {} already ingested from another library", item.id);
                    continue;
                }
                ctx.checkpoint()?;
                let mut show = self.fetch_show(item, &library.id).await?;
                episodes += show.episodes.len();
                if let Some(old) = by_id.get(show.id.as_str()) {
                    show.metadata_synced = old.metadata_synced;
                    show.metadata_failed = old.metadata_failed;
                    carried += carry_virtual(&mut show, old);
                }

                self.shows.insert_seasons(&show.seasons)?;
                self.shows.insert_episodes(&show.episodes)?;
                self.shows.insert_show(&show)?;
            }

            ctx.progress(PROGRESS.at(i + 1, targets.len()));
        }

        info!(
            "Show sync complete: {} shows, {} episodes, {} missing episodes kept ({} shows before)",
            ingested.len(),
            episodes,
            carried,
            previous.len()
        );
        Ok(ShowSyncSummary {
            shows: ingested.len(),
            episodes,
            carried_episodes: carried,
            previous,
        })
    }

    /// Fetch one series' seasons and episodes in a single recursive query
    async fn fetch_show(&self, item: &BaseItem, library_id: &str) -> Result<Show> {
        let query = ItemQuery::under(&item.id)
            .with_types(&[item_types::SEASON, item_types::EPISODE])
            .with_fields(SHOW_FIELDS);
        let children = self.client.get_items(&query).await.map_err(SyncError::Fetch)?;

        let mut show = convert::show(item, library_id);
        let mut season_ids: HashSet<&str> = HashSet::new();
        let seasons: Vec<Season> = children
            .items
            .iter()
            .filter(|c| c.is_type(item_types::SEASON) && c.parent_id.as_deref() == Some(item.id.as_str()))
            .filter(|c| season_ids.insert(c.id.as_str()))
            .map(|c| convert::season(c, &show.id))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut episodes: Vec<Episode> = Vec::new();
        for child in children.items.iter().filter(|c| c.is_type(item_types::EPISODE)) {
            let season_id = child.season_id.as_deref().or(child.parent_id.as_deref());
            match season_id {
                Some(season_id) if season_ids.contains(season_id) => {
                    if seen.insert(child.id.as_str()) {
                        episodes.push(convert::episode(child, &show.id, season_id));
                    }
                }
                _ => debug!("Episode {} of {} has no known season, skipping", child.id, show.id),
            }
        }

        show.cumulative_run_time_ticks = episodes.iter().map(|e| e.run_time_ticks.unwrap_or(0)).sum();
        show.seasons = seasons;
        show.episodes = episodes;
        Ok(show)
    }
}

/// Keep the previous pass's virtual seasons and episodes that the disk still does not cover.
///
/// Episodes are matched to the new seasons by season number, so a season re-created on the
/// server under a new id keeps its missing episodes.
fn carry_virtual(show: &mut Show, old: &Show) -> usize {
    for season in old.seasons.iter().filter(|s| s.location_type == LocationType::Virtual) {
        let Some(index) = season.index_number else {
            continue;
        };
        if show.season_by_index(index).is_none() {
            show.seasons.push(season.clone());
        }
    }

    let old_index: HashMap<&str, Option<i32>> =
        old.seasons.iter().map(|s| (s.id.as_str(), s.index_number)).collect();
    let mut carried = 0;
    for episode in old.episodes.iter().filter(|e| e.location_type == LocationType::Virtual) {
        let Some(Some(index)) = old_index.get(episode.season_id.as_str()).copied() else {
            continue;
        };
        let Some(season_id) = show.season_by_index(index).map(|s| s.id.clone()) else {
            continue;
        };
        let covered = episode
            .index_number
            .is_some_and(|n| show.episodes_in_season(&season_id).any(|e| e.covers(n)));
        if covered || show.episodes.iter().any(|e| e.id == episode.id) {
            continue;
        }
        show.episodes.push(Episode {
            season_id,
            ..episode.clone()
        });
        carried += 1;
    }
    carried
}
