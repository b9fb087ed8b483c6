pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, LoggingConfig, MetadataConfig, SchedulerConfig, ServerConfig, SyncSettings, default_scheduler_config};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
