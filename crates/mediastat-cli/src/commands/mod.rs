pub mod clear;
pub mod config;
pub mod daemon;
pub mod stats;
pub mod sync;
mod progress;

use crate::output::Output;
use color_eyre::Result;
use media_stat_config::{Config, CredentialStore, LoggingConfig, PathManager};
use media_stat_core::{CatalogStore, Repositories, SnapshotStorage, SyncOrchestrator};
use media_stat_sources::{EmbyClient, TvdbClient};
use std::sync::Arc;
use tracing::debug;

/// Logging section of the config file, or defaults when there is none yet
pub fn load_logging_config() -> LoggingConfig {
    let config_file = PathManager::default().config_file();
    Config::load_from_file(&config_file)
        .map(|c| c.logging)
        .unwrap_or_default()
}

pub fn load_config(path_manager: &PathManager) -> Result<Config> {
    let config_file = path_manager.config_file();
    if !config_file.exists() {
        return Err(color_eyre::eyre::eyre!(
            "Configuration file not found at {}. Run 'mediastat config server --url <URL> --user-id <ID>' first.",
            config_file.display()
        ));
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;
    Ok(config)
}

pub fn load_credentials(path_manager: &PathManager) -> Result<CredentialStore> {
    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store.load().map_err(|e| {
        color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e)
    })?;
    Ok(cred_store)
}

/// Everything a sync needs: the orchestrator plus the catalog it writes and where it is saved
pub struct SyncRuntime {
    pub orchestrator: SyncOrchestrator,
    pub store: Arc<CatalogStore>,
    pub snapshot: SnapshotStorage,
}

impl SyncRuntime {
    pub fn build(config: &Config, credentials: &CredentialStore, path_manager: &PathManager, output: &Output) -> Result<Self> {
        let api_key = credentials.get_server_api_key().ok_or_else(|| {
            color_eyre::eyre::eyre!("No media server API key stored. Run 'mediastat config server' to set one.")
        })?;
        let client = EmbyClient::new(&config.server.url, &config.server.user_id, api_key)?;

        let snapshot = SnapshotStorage::new(path_manager.catalog_file());
        let store = Arc::new(snapshot.load()?);
        let mut orchestrator =
            SyncOrchestrator::new(Arc::new(client), Repositories::from_store(store.clone()), config.clone());

        if config.metadata.enabled {
            match credentials.get_metadata_api_key() {
                Some(key) => {
                    let provider = TvdbClient::new(&config.metadata.base_url)?;
                    orchestrator = orchestrator.with_metadata_provider(Arc::new(provider), key.clone());
                }
                None => output.warn(
                    "Metadata provider enabled but no API key stored; missing episodes will not be detected. Run 'mediastat config metadata'.",
                ),
            }
        } else {
            debug!("Metadata provider disabled in configuration");
        }

        Ok(Self { orchestrator, store, snapshot })
    }

    pub fn save(&self) -> Result<()> {
        self.snapshot.save(&self.store)?;
        Ok(())
    }
}

/// Mask a secret for display, keeping two characters at each end
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<not set>");
        assert_eq!(mask_secret("abcd"), "****");
        assert_eq!(mask_secret("abcdef123"), "ab***23");
    }
}
