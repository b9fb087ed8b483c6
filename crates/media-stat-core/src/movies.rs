use media_stat_config::SyncSettings;
use media_stat_models::{Library, Movie};
use media_stat_sources::emby::{api::MOVIE_FIELDS, item_types, BaseItem, ItemQuery, SortOrder};
use media_stat_sources::MediaServerClient;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use crate::context::{ProgressBand, RunContext};
use crate::convert;
use crate::error::{Result, SyncError};
use crate::store::MovieRepository;

const PROGRESS: ProgressBand = ProgressBand::new(15.0, 35.0);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieSyncSummary {
    pub libraries: usize,
    pub movies: usize,
    pub box_sets: usize,
}

/// Replaces the movie store with the movies of every movie-type library
pub struct MovieSync {
    client: Arc<dyn MediaServerClient>,
    movies: Arc<dyn MovieRepository>,
    settings: SyncSettings,
}

impl MovieSync {
    pub fn new(
        client: Arc<dyn MediaServerClient>,
        movies: Arc<dyn MovieRepository>,
        settings: SyncSettings,
    ) -> Self {
        Self { client, movies, settings }
    }

    #[instrument(skip_all)]
    pub async fn sync(&self, libraries: &[Library], ctx: &RunContext) -> Result<MovieSyncSummary> {
        self.movies.remove_movies()?;

        let targets: Vec<&Library> = libraries
            .iter()
            .filter(|l| self.settings.is_movie_library(l.library_type))
            .collect();
        let mut summary = MovieSyncSummary {
            libraries: targets.len(),
            ..MovieSyncSummary::default()
        };

        for (i, library) in targets.iter().enumerate() {
            ctx.info(format!("Processing movies for library '{}'", library.name));
            let (movies, box_sets) = self.sync_library(library, ctx).await?;
            summary.movies += movies;
            summary.box_sets += box_sets;
            ctx.progress(PROGRESS.at(i + 1, targets.len()));
        }

        info!(
            "Movie sync complete: {} movies from {} libraries ({} box sets expanded)",
            summary.movies, summary.libraries, summary.box_sets
        );
        Ok(summary)
    }

    /// Page through one library, upserting each page before the next fetch
    async fn sync_library(&self, library: &Library, ctx: &RunContext) -> Result<(usize, usize)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut box_sets = 0;
        let mut start: u32 = 0;

        loop {
            ctx.checkpoint()?;
            let query = ItemQuery::under(&library.id)
                .with_types(&[item_types::MOVIE, item_types::BOX_SET])
                .with_fields(MOVIE_FIELDS)
                .sorted_by("SortName", SortOrder::Ascending)
                .with_page(start, self.settings.page_size);
            let page = self.client.get_items(&query).await.map_err(SyncError::Fetch)?;

            let mut batch = Vec::new();
            for item in &page.items {
                if item.is_type(item_types::BOX_SET) {
                    box_sets += 1;
                    for child in self.expand_box_set(&item.id, ctx).await? {
                        push_unique(&mut batch, &mut seen, &child, &library.id);
                    }
                } else if item.is_type(item_types::MOVIE) {
                    push_unique(&mut batch, &mut seen, item, &library.id);
                }
            }
            self.movies.upsert_movies(&batch)?;
            debug!(
                library = %library.id,
                start,
                fetched = page.items.len(),
                stored = batch.len(),
                "Stored movie page"
            );

            start += page.items.len() as u32;
            if page.items.is_empty() || start >= page.total_record_count {
                break;
            }
        }

        Ok((seen.len(), box_sets))
    }

    /// Movies inside a box set, following nested box sets with an explicit worklist
    async fn expand_box_set(&self, box_set_id: &str, ctx: &RunContext) -> Result<Vec<BaseItem>> {
        let mut pending = vec![box_set_id.to_string()];
        let mut visited: HashSet<String> = HashSet::new();
        let mut movies = Vec::new();

        while let Some(parent) = pending.pop() {
            if !visited.insert(parent.clone()) {
                continue;
            }
            ctx.checkpoint()?;
            let query = ItemQuery::under(&parent)
                .with_types(&[item_types::MOVIE, item_types::BOX_SET])
                .with_fields(MOVIE_FIELDS)
                .with_page(0, self.settings.box_set_limit);
            let children = self.client.get_items(&query).await.map_err(SyncError::Fetch)?;

            for child in children.items {
                if child.is_type(item_types::BOX_SET) {
                    pending.push(child.id);
                } else if child.is_type(item_types::MOVIE) {
                    movies.push(child);
                }
            }
        }

        debug!("Box set {} expanded to {} movies", box_set_id, movies.len());
        Ok(movies)
    }
}

fn push_unique(batch: &mut Vec<Movie>, seen: &mut HashSet<String>, item: &BaseItem, library_id: &str) {
    if seen.insert(item.id.clone()) {
        batch.push(convert::movie(item, library_id));
    }
}
