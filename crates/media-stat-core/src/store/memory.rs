use chrono::{DateTime, Utc};
use media_stat_models::{Episode, Library, Movie, Season, Show, Statistic, StatisticKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use crate::error::{StoreError, StoreResult};
use crate::store::repository::{
    LibraryRepository, MovieRepository, ShowRepository, StatisticsRepository, WatermarkRepository,
};

/// Everything the catalog persists, in snapshot form
///
/// Show rows are kept without their collections; seasons and episodes point back
/// to their show by id and are attached when shows are read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogState {
    pub libraries: Vec<Library>,
    pub movies: BTreeMap<String, Movie>,
    pub shows: BTreeMap<String, Show>,
    pub seasons: BTreeMap<String, Season>,
    pub episodes: BTreeMap<String, Episode>,
    pub statistics: Vec<Statistic>,
    pub last_update: Option<DateTime<Utc>>,
}

/// In-memory catalog implementing every repository
#[derive(Debug, Default)]
pub struct CatalogStore {
    state: RwLock<CatalogState>,
}

fn in_libraries(library_id: &str, library_ids: &[String]) -> bool {
    library_ids.is_empty() || library_ids.iter().any(|id| id == library_id)
}

fn show_row(show: &Show) -> Show {
    Show {
        seasons: Vec::new(),
        episodes: Vec::new(),
        ..show.clone()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: CatalogState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the current state for persistence
    pub fn snapshot(&self) -> StoreResult<CatalogState> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, CatalogState>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, CatalogState>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    /// Attach seasons and episodes to the selected show rows
    fn assemble<'a>(state: &CatalogState, rows: impl Iterator<Item = &'a Show>) -> Vec<Show> {
        let mut shows: Vec<Show> = rows.cloned().collect();
        if shows.is_empty() {
            return shows;
        }

        let mut seasons: HashMap<&str, Vec<Season>> = HashMap::new();
        for season in state.seasons.values() {
            seasons.entry(season.show_id.as_str()).or_default().push(season.clone());
        }
        let mut episodes: HashMap<&str, Vec<Episode>> = HashMap::new();
        for episode in state.episodes.values() {
            episodes.entry(episode.show_id.as_str()).or_default().push(episode.clone());
        }

        for show in &mut shows {
            let mut show_seasons = seasons.remove(show.id.as_str()).unwrap_or_default();
            show_seasons.sort_by_key(|s| s.index_number);
            let mut show_episodes = episodes.remove(show.id.as_str()).unwrap_or_default();
            show_episodes.sort_by(|a, b| {
                a.season_id.cmp(&b.season_id).then(a.index_number.cmp(&b.index_number))
            });
            show.seasons = show_seasons;
            show.episodes = show_episodes;
        }
        shows
    }
}

impl LibraryRepository for CatalogStore {
    fn replace_libraries(&self, libraries: &[Library]) -> StoreResult<()> {
        let mut state = self.write()?;
        state.libraries = libraries.to_vec();
        debug!(count = libraries.len(), "Replaced libraries");
        Ok(())
    }

    fn libraries(&self) -> StoreResult<Vec<Library>> {
        Ok(self.read()?.libraries.clone())
    }
}

impl MovieRepository for CatalogStore {
    fn remove_movies(&self) -> StoreResult<()> {
        self.write()?.movies.clear();
        Ok(())
    }

    fn upsert_movies(&self, movies: &[Movie]) -> StoreResult<()> {
        let mut state = self.write()?;
        for movie in movies {
            state.movies.insert(movie.id.clone(), movie.clone());
        }
        Ok(())
    }

    fn movie_by_id(&self, id: &str) -> StoreResult<Option<Movie>> {
        Ok(self.read()?.movies.get(id).cloned())
    }

    fn movies(&self, library_ids: &[String]) -> StoreResult<Vec<Movie>> {
        Ok(self
            .read()?
            .movies
            .values()
            .filter(|m| in_libraries(&m.library_id, library_ids))
            .cloned()
            .collect())
    }
}

impl ShowRepository for CatalogStore {
    fn remove_shows(&self) -> StoreResult<()> {
        let mut state = self.write()?;
        state.seasons.clear();
        state.episodes.clear();
        state.shows.clear();
        Ok(())
    }

    fn insert_show(&self, show: &Show) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.shows.contains_key(&show.id) {
            return Err(StoreError::Duplicate { entity: "show", id: show.id.clone() });
        }
        state.shows.insert(show.id.clone(), show_row(show));
        Ok(())
    }

    fn insert_seasons(&self, seasons: &[Season]) -> StoreResult<()> {
        let mut state = self.write()?;
        if let Some(dup) = seasons.iter().find(|s| state.seasons.contains_key(&s.id)) {
            return Err(StoreError::Duplicate { entity: "season", id: dup.id.clone() });
        }
        for season in seasons {
            state.seasons.insert(season.id.clone(), season.clone());
        }
        Ok(())
    }

    fn insert_episodes(&self, episodes: &[Episode]) -> StoreResult<()> {
        let mut state = self.write()?;
        for episode in episodes {
            if !state.seasons.contains_key(&episode.season_id) {
                return Err(StoreError::Missing { entity: "season", id: episode.season_id.clone() });
            }
            if state.episodes.contains_key(&episode.id) {
                return Err(StoreError::Duplicate { entity: "episode", id: episode.id.clone() });
            }
        }
        for episode in episodes {
            state.episodes.insert(episode.id.clone(), episode.clone());
        }
        Ok(())
    }

    fn update_show(&self, show: &Show) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.shows.get_mut(&show.id) {
            Some(row) => {
                *row = show_row(show);
                Ok(())
            }
            None => Err(StoreError::Missing { entity: "show", id: show.id.clone() }),
        }
    }

    fn show_by_id(&self, id: &str) -> StoreResult<Option<Show>> {
        let state = self.read()?;
        Ok(Self::assemble(&state, state.shows.get(id).into_iter()).pop())
    }

    fn season_by_id(&self, id: &str) -> StoreResult<Option<Season>> {
        Ok(self.read()?.seasons.get(id).cloned())
    }

    fn episode_by_id(&self, id: &str) -> StoreResult<Option<Episode>> {
        Ok(self.read()?.episodes.get(id).cloned())
    }

    fn shows(&self, library_ids: &[String]) -> StoreResult<Vec<Show>> {
        let state = self.read()?;
        let rows = state.shows.values().filter(|s| in_libraries(&s.library_id, library_ids));
        Ok(Self::assemble(&state, rows))
    }

    fn shows_with_external_id(&self) -> StoreResult<Vec<Show>> {
        let state = self.read()?;
        let rows = state.shows.values().filter(|s| s.external_id().is_some());
        Ok(Self::assemble(&state, rows))
    }
}

impl StatisticsRepository for CatalogStore {
    fn invalidate_statistics(&self, kind: StatisticKind) -> StoreResult<usize> {
        let mut state = self.write()?;
        let before = state.statistics.len();
        state.statistics.retain(|s| s.kind != kind);
        Ok(before - state.statistics.len())
    }

    fn insert_statistic(&self, statistic: Statistic) -> StoreResult<()> {
        let mut state = self.write()?;
        state
            .statistics
            .retain(|s| !s.matches(statistic.kind, &statistic.collection_ids));
        state.statistics.push(statistic);
        Ok(())
    }

    fn find_statistic(&self, kind: StatisticKind, collection_ids: &BTreeSet<String>) -> StoreResult<Option<Statistic>> {
        Ok(self
            .read()?
            .statistics
            .iter()
            .find(|s| s.matches(kind, collection_ids))
            .cloned())
    }

    fn statistics(&self, kind: StatisticKind) -> StoreResult<Vec<Statistic>> {
        Ok(self
            .read()?
            .statistics
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect())
    }
}

impl WatermarkRepository for CatalogStore {
    fn last_update(&self) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.read()?.last_update)
    }

    fn set_last_update(&self, at: Option<DateTime<Utc>>) -> StoreResult<()> {
        self.write()?.last_update = at;
        Ok(())
    }
}
