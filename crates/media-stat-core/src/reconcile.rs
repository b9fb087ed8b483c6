use chrono::{DateTime, Utc};
use media_stat_models::{Episode, LocationType, Season, Show};
use media_stat_sources::MetadataProvider;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use crate::context::{ProgressBand, RunContext};
use crate::convert;
use crate::error::{Result, SyncError};
use crate::store::{ShowRepository, WatermarkRepository};

const PROGRESS: ProgressBand = ProgressBand::new(55.0, 85.0);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub selected: usize,
    pub reconciled: usize,
    pub failed: usize,
    pub missing_episodes: usize,
}

/// Fills episode gaps of local shows from the metadata provider
pub struct EpisodeReconciler {
    provider: Arc<dyn MetadataProvider>,
    shows: Arc<dyn ShowRepository>,
    watermark: Arc<dyn WatermarkRepository>,
    api_key: String,
}

impl EpisodeReconciler {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        shows: Arc<dyn ShowRepository>,
        watermark: Arc<dyn WatermarkRepository>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            shows,
            watermark,
            api_key: api_key.into(),
        }
    }

    /// Reconcile the shows that need it, given the catalog as it was before this run
    #[instrument(skip_all)]
    pub async fn reconcile(&self, previous: &[Show], ctx: &RunContext) -> Result<ReconcileSummary> {
        let current = self.shows.shows_with_external_id()?;
        let since = self.watermark.last_update()?;

        self.provider.login(&self.api_key).await.map_err(SyncError::Metadata)?;

        let changed_remotely: HashSet<String> = match since {
            Some(since) => {
                let ids: Vec<String> = current
                    .iter()
                    .filter_map(|s| s.external_id().map(str::to_string))
                    .collect();
                self.provider
                    .get_changed_shows(&ids, since)
                    .await
                    .map_err(SyncError::Metadata)?
                    .into_iter()
                    .collect()
            }
            None => HashSet::new(),
        };

        let selected = select_shows(&current, previous, &changed_remotely);
        let mut summary = ReconcileSummary {
            selected: selected.len(),
            ..ReconcileSummary::default()
        };
        ctx.info(format!(
            "Reconciling {} of {} shows against the metadata provider",
            selected.len(),
            current.len()
        ));

        let now = Utc::now();
        for (i, show) in selected.iter().enumerate() {
            ctx.checkpoint()?;
            match self.reconcile_show(show, now).await {
                Ok(added) => {
                    summary.reconciled += 1;
                    summary.missing_episodes += added;
                }
                Err(SyncError::Metadata(e)) if e.is_not_found() => {
                    ctx.warn(format!("Show '{}' not found on the metadata provider: {}", show.name, e));
                    self.mark_failed(show)?;
                    summary.failed += 1;
                }
                Err(e) => {
                    ctx.error(format!("Failed to reconcile show '{}': {}", show.name, e));
                    self.mark_failed(show)?;
                    summary.failed += 1;
                }
            }
            ctx.progress(PROGRESS.at(i + 1, selected.len()));
        }

        self.watermark.set_last_update(Some(now))?;
        info!(
            "Reconciliation complete: {} reconciled, {} failed, {} missing episodes added",
            summary.reconciled, summary.failed, summary.missing_episodes
        );
        Ok(summary)
    }

    async fn reconcile_show(&self, show: &Show, now: DateTime<Utc>) -> Result<usize> {
        let external_id = show.external_id().unwrap_or_default();
        let records = self
            .provider
            .get_episodes(external_id)
            .await
            .map_err(SyncError::Metadata)?;

        let mut created: Vec<Season> = Vec::new();
        let mut missing: Vec<Episode> = Vec::new();

        for record in records.iter().filter(|r| r.has_aired(now)) {
            let known = show
                .season_by_index(record.season_number)
                .or_else(|| created.iter().find(|s| s.index_number == Some(record.season_number)))
                .map(|s| s.id.clone());
            let season_id = match known {
                Some(id) => id,
                None => {
                    let season = convert::synthesized_season(&show.id, record.season_number);
                    self.shows.insert_seasons(std::slice::from_ref(&season))?;
                    debug!("Created season {} for show {}", record.season_number, show.id);
                    let id = season.id.clone();
                    created.push(season);
                    id
                }
            };

            let present = show
                .episodes_in_season(&season_id)
                .chain(missing.iter().filter(|e| e.season_id == season_id))
                .any(|e| e.covers(record.episode_number));
            if present {
                continue;
            }
            // a provider episode moved to another season keeps its id
            let episode = convert::missing_episode(record, &show.id, &season_id);
            if !show.episodes.iter().any(|e| e.id == episode.id) {
                missing.push(episode);
            }
        }

        if !missing.is_empty() {
            self.shows.insert_episodes(&missing)?;
        }
        let mut updated = show.clone();
        updated.metadata_synced = true;
        self.shows.update_show(&updated)?;

        debug!(
            show = %show.id,
            provider_episodes = records.len(),
            missing = missing.len(),
            "Reconciled show"
        );
        Ok(missing.len())
    }

    fn mark_failed(&self, show: &Show) -> Result<()> {
        let mut failed = show.clone();
        failed.metadata_failed = true;
        self.shows.update_show(&failed)?;
        Ok(())
    }
}

/// Disk layout of a show: season numbers and episode spans, order-independent
fn structure(show: &Show) -> (Vec<Option<i32>>, Vec<(Option<i32>, Option<i32>, Option<i32>)>) {
    let season_index: HashMap<&str, Option<i32>> =
        show.seasons.iter().map(|s| (s.id.as_str(), s.index_number)).collect();

    let mut seasons: Vec<Option<i32>> = show
        .seasons
        .iter()
        .filter(|s| s.location_type == LocationType::Disk)
        .map(|s| s.index_number)
        .collect();
    seasons.sort();

    let mut episodes: Vec<_> = show
        .disk_episodes()
        .map(|e| {
            let season = season_index.get(e.season_id.as_str()).copied().flatten();
            (season, e.index_number, e.index_number_end)
        })
        .collect();
    episodes.sort();
    (seasons, episodes)
}

/// Shows to reconcile: never synced, then changed locally, then changed on the provider.
/// One show per external id.
fn select_shows<'a>(
    current: &'a [Show],
    previous: &[Show],
    changed_remotely: &HashSet<String>,
) -> Vec<&'a Show> {
    let previous: HashMap<&str, &Show> = previous.iter().map(|s| (s.id.as_str(), s)).collect();
    let changed_locally = |show: &Show| match previous.get(show.id.as_str()) {
        Some(old) => structure(old) != structure(show),
        None => true,
    };

    let mut external_ids: HashSet<&str> = HashSet::new();
    let mut selected = Vec::new();
    let passes: [&dyn Fn(&Show) -> bool; 3] = [
        &|s: &Show| !s.metadata_synced,
        &changed_locally,
        &|s: &Show| s.external_id().is_some_and(|id| changed_remotely.contains(id)),
    ];

    for pass in passes {
        for show in current.iter().filter(|s| pass(s)) {
            if let Some(id) = show.external_id() {
                if external_ids.insert(id) {
                    selected.push(show);
                }
            }
        }
    }
    selected
}

#[cfg(test)]
mod tests;
