use chrono::Utc;
use media_stat_models::{
    GenreCount, Movie, MovieStatistics, MovieSummary, Show, ShowStatistics, Statistic,
    StatisticKind, StatisticPayload, TICKS_PER_MINUTE,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use crate::context::{ProgressBand, RunContext};
use crate::error::{Result, SyncError};
use crate::power_set::PowerSet;
use crate::store::{MovieRepository, ShowRepository, StatisticsRepository};

/// Precomputes statistics for every combination of libraries
pub struct StatisticsEngine {
    movies: Arc<dyn MovieRepository>,
    shows: Arc<dyn ShowRepository>,
    statistics: Arc<dyn StatisticsRepository>,
}

impl StatisticsEngine {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        shows: Arc<dyn ShowRepository>,
        statistics: Arc<dyn StatisticsRepository>,
    ) -> Self {
        Self { movies, shows, statistics }
    }

    /// Drop every row of `kind`, then write one row per subset of `library_ids`
    ///
    /// The empty subset is stored unfiltered, covering every library. Returns the number
    /// of rows written.
    #[instrument(skip(self, library_ids, ctx), fields(libraries = library_ids.len()))]
    pub fn recalculate(
        &self,
        kind: StatisticKind,
        library_ids: &[String],
        band: ProgressBand,
        ctx: &RunContext,
    ) -> Result<usize> {
        let invalidated = self.statistics.invalidate_statistics(kind)?;
        debug!("Invalidated {} {} statistics", invalidated, kind);

        let mut ids: Vec<String> = Vec::with_capacity(library_ids.len());
        for id in library_ids {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        let subsets = PowerSet::new(&ids).ok_or_else(|| {
            SyncError::Statistics(format!("{} libraries are too many to combine", ids.len()))
        })?;
        let total = subsets.size() as usize;

        let mut written = 0;
        for (i, subset) in subsets.enumerate() {
            let filter: Vec<String> = subset.iter().cloned().collect();
            let payload = match kind {
                StatisticKind::Movie => StatisticPayload::Movie(movie_statistics(&self.movies.movies(&filter)?)),
                StatisticKind::Show => StatisticPayload::Show(show_statistics(&self.shows.shows(&filter)?)),
            };
            self.statistics.insert_statistic(Statistic {
                kind,
                collection_ids: subset,
                calculated_at: Utc::now(),
                payload,
            })?;
            written += 1;
            ctx.progress(band.at(i + 1, total));
        }

        info!("Calculated {} {} statistics over {} libraries", written, kind, ids.len());
        Ok(written)
    }
}

fn genre_histogram<'a>(genres: impl Iterator<Item = &'a String>) -> Vec<GenreCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for genre in genres {
        *counts.entry(genre.as_str()).or_insert(0) += 1;
    }
    let mut histogram: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount { genre: genre.to_string(), count })
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    histogram
}

fn summary(movie: &Movie) -> MovieSummary {
    MovieSummary {
        id: movie.id.clone(),
        name: movie.name.clone(),
        community_rating: movie.community_rating,
        production_year: movie.production_year,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn movie_statistics(movies: &[Movie]) -> MovieStatistics {
    let dated = movies.iter().filter_map(|m| m.premiere_date.map(|d| (d, m)));

    let mut highest: Option<&Movie> = None;
    for movie in movies {
        if let Some(rating) = movie.community_rating {
            if highest.and_then(|h| h.community_rating).map_or(true, |best| rating > best) {
                highest = Some(movie);
            }
        }
    }

    MovieStatistics {
        movie_count: movies.len() as u64,
        total_run_time_ticks: movies.iter().map(|m| m.run_time_ticks.unwrap_or(0)).sum(),
        mean_run_time_minutes: mean(
            movies
                .iter()
                .filter_map(|m| m.run_time_ticks)
                .map(|t| t as f64 / TICKS_PER_MINUTE as f64),
        ),
        mean_community_rating: mean(movies.iter().filter_map(|m| m.community_rating).map(f64::from)),
        oldest_premiere: dated.clone().min_by_key(|(d, _)| *d).map(|(_, m)| summary(m)),
        newest_premiere: dated.max_by_key(|(d, _)| *d).map(|(_, m)| summary(m)),
        highest_rated: highest.map(summary),
        without_imdb_id: movies.iter().filter(|m| m.provider_ids.imdb.is_none()).count() as u64,
        genres: genre_histogram(movies.iter().flat_map(|m| m.genres.iter())),
    }
}

pub fn show_statistics(shows: &[Show]) -> ShowStatistics {
    ShowStatistics {
        show_count: shows.len() as u64,
        season_count: shows.iter().map(|s| s.seasons.len() as u64).sum(),
        episode_count: shows.iter().map(|s| s.disk_episodes().count() as u64).sum(),
        missing_episode_count: shows.iter().map(|s| s.missing_episode_count() as u64).sum(),
        complete_show_count: shows
            .iter()
            .filter(|s| s.metadata_synced && s.missing_episode_count() == 0)
            .count() as u64,
        metadata_failed_count: shows.iter().filter(|s| s.metadata_failed).count() as u64,
        total_run_time_ticks: shows.iter().map(|s| s.cumulative_run_time_ticks).sum(),
        genres: genre_histogram(shows.iter().flat_map(|s| s.genres.iter())),
    }
}
