pub mod context;
pub mod convert;
pub mod error;
pub mod libraries;
pub mod movies;
pub mod power_set;
pub mod reconcile;
pub mod shows;
pub mod statistics;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ChannelSink, EventSink, LogLevel, NullSink, ProgressBand, RunContext, SyncEvent};
pub use error::{Result, StoreError, StoreResult, SyncError};
pub use libraries::LibraryFetcher;
pub use movies::{MovieSync, MovieSyncSummary};
pub use power_set::PowerSet;
pub use reconcile::{EpisodeReconciler, ReconcileSummary};
pub use shows::{ShowSync, ShowSyncSummary};
pub use statistics::StatisticsEngine;
pub use store::{CatalogStore, Repositories, SnapshotStorage};
pub use sync::{SyncOrchestrator, SyncReport};
