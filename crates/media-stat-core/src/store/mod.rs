pub mod repository;
pub mod memory;
pub mod snapshot;

pub use repository::{LibraryRepository, MovieRepository, ShowRepository, StatisticsRepository, WatermarkRepository};
pub use memory::{CatalogState, CatalogStore};
pub use snapshot::SnapshotStorage;

use std::sync::Arc;

/// Repository handles the pipeline writes through
#[derive(Clone)]
pub struct Repositories {
    pub libraries: Arc<dyn LibraryRepository>,
    pub movies: Arc<dyn MovieRepository>,
    pub shows: Arc<dyn ShowRepository>,
    pub statistics: Arc<dyn StatisticsRepository>,
    pub watermark: Arc<dyn WatermarkRepository>,
}

impl Repositories {
    /// Every repository backed by the same catalog store
    pub fn from_store(store: Arc<CatalogStore>) -> Self {
        Self {
            libraries: store.clone(),
            movies: store.clone(),
            shows: store.clone(),
            statistics: store.clone(),
            watermark: store,
        }
    }
}
