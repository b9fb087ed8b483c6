use media_stat_models::LibraryType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for one sync run
///
/// Loaded once and handed to the pipeline by reference; nothing mutates it while a
/// run is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base address of the media server, e.g. `http://localhost:8096`
    pub url: String,
    pub user_id: String,
    /// Body returned by the ping endpoint of a healthy server
    #[serde(default = "default_expected_identity")]
    pub expected_identity: String,
    /// Stop the run when the liveness check fails instead of only warning
    #[serde(default)]
    pub abort_on_unreachable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_movie_library_types")]
    pub movie_library_types: Vec<LibraryType>,
    #[serde(default = "default_show_library_types")]
    pub show_library_types: Vec<LibraryType>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_box_set_limit")]
    pub box_set_limit: u32,
    #[serde(default = "default_true")]
    pub statistics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_expected_identity() -> String {
    "Emby Server".to_string()
}

fn default_movie_library_types() -> Vec<LibraryType> {
    vec![LibraryType::Movies, LibraryType::Other, LibraryType::HomeVideos]
}

fn default_show_library_types() -> Vec<LibraryType> {
    vec![LibraryType::TvShows, LibraryType::Other]
}

fn default_page_size() -> u32 {
    100
}

fn default_box_set_limit() -> u32 {
    1000
}

fn default_metadata_base_url() -> String {
    "https://api.thetvdb.com".to_string()
}

fn default_schedule() -> String {
    "0 0 */6 * * *".to_string() // Every 6 hours (sec min hour dom mon dow)
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            movie_library_types: default_movie_library_types(),
            show_library_types: default_show_library_types(),
            page_size: default_page_size(),
            box_set_limit: default_box_set_limit(),
            statistics: default_true(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_metadata_base_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

impl SyncSettings {
    pub fn is_movie_library(&self, library_type: LibraryType) -> bool {
        self.movie_library_types.contains(&library_type)
    }

    pub fn is_show_library(&self, library_type: LibraryType) -> bool {
        self.show_library_types.contains(&library_type)
    }
}

impl Config {
    pub fn new(server_url: String, user_id: String) -> Self {
        Self {
            server: ServerConfig {
                url: server_url,
                user_id,
                expected_identity: default_expected_identity(),
                abort_on_unreachable: false,
            },
            sync: SyncSettings::default(),
            metadata: MetadataConfig::default(),
            scheduler: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.server.url.trim();
        if url.is_empty() {
            return Err(anyhow::anyhow!("server.url is required"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow::anyhow!("server.url must start with http:// or https://"));
        }
        if self.server.user_id.trim().is_empty() {
            return Err(anyhow::anyhow!("server.user_id is required"));
        }
        if self.sync.page_size == 0 {
            return Err(anyhow::anyhow!("sync.page_size must be greater than zero"));
        }
        if self.sync.box_set_limit == 0 {
            return Err(anyhow::anyhow!("sync.box_set_limit must be greater than zero"));
        }
        if self.sync.movie_library_types.contains(&LibraryType::BoxSets)
            || self.sync.show_library_types.contains(&LibraryType::BoxSets)
        {
            return Err(anyhow::anyhow!("boxsets are expanded through movie libraries and cannot be listed as a library type"));
        }
        if self.metadata.enabled && self.metadata.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("metadata.base_url is required when metadata is enabled"));
        }
        Ok(())
    }
}
