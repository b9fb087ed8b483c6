use media_stat_models::{Library, LibraryType};
use media_stat_sources::MediaServerClient;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use crate::convert;
use crate::error::{Result, SyncError};

/// Reads the server's root folders as libraries
pub struct LibraryFetcher {
    client: Arc<dyn MediaServerClient>,
}

impl LibraryFetcher {
    pub fn new(client: Arc<dyn MediaServerClient>) -> Self {
        Self { client }
    }

    /// Every root folder except box-set containers
    #[instrument(skip(self))]
    pub async fn fetch_libraries(&self) -> Result<Vec<Library>> {
        let folders = self.client.get_root_folders().await.map_err(SyncError::Fetch)?;

        let libraries: Vec<Library> = folders
            .iter()
            .map(convert::library)
            .filter(|library| {
                if library.library_type == LibraryType::BoxSets {
                    debug!("Skipping box-set folder '{}'", library.name);
                    return false;
                }
                true
            })
            .collect();

        info!(
            "Fetched {} libraries ({} root folders)",
            libraries.len(),
            folders.len()
        );
        Ok(libraries)
    }
}
