use media_stat_sources::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode catalog snapshot: {0}")]
    Encode(String),

    #[error("failed to decode catalog snapshot: {0}")]
    Decode(String),

    #[error("{entity} '{id}' does not exist")]
    Missing { entity: &'static str, id: String },

    #[error("{entity} '{id}' already exists")]
    Duplicate { entity: &'static str, id: String },

    #[error("catalog lock poisoned")]
    Poisoned,
}

/// Failures that end (or, for metadata, isolate) part of a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    /// A media server fetch failed; fatal to the run
    #[error("media server request failed: {0}")]
    Fetch(#[source] SourceError),

    /// A metadata provider call failed
    #[error("metadata provider request failed: {0}")]
    Metadata(#[source] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("sync run was cancelled")]
    Cancelled,

    #[error("a sync run is already in progress")]
    AlreadyRunning,

    #[error("media server at {0} is unreachable")]
    ServerUnreachable(String),

    #[error("statistics calculation failed: {0}")]
    Statistics(String),
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
