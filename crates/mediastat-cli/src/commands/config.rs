use super::{load_credentials, mask_secret};
use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use media_stat_config::{Config, CredentialStore, PathManager};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, output),
        ConfigCommands::Server { url, user_id, api_key, abort_on_unreachable } => {
            configure_server(url, user_id, api_key, abort_on_unreachable, output)
        }
        ConfigCommands::Metadata { enabled, base_url, api_key } => {
            configure_metadata(enabled, base_url, api_key, output)
        }
        ConfigCommands::Sync { page_size, box_set_limit, statistics } => {
            configure_sync(page_size, box_set_limit, statistics, output)
        }
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'mediastat config server --url <URL> --user-id <ID>' to create it.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let credentials = load_credentials(&path_manager)?;
    let secret = |value: Option<&String>| match value {
        Some(v) if full => v.clone(),
        Some(v) => mask_secret(v),
        None => "<not set>".to_string(),
    };

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            println!("\n{}", "Configuration".bright_cyan().bold());
            println!("{} {}\n", "File:".bright_white(), config_file.display());

            let mut table = section_table("Media Server");
            table.add_row(vec![Cell::new("URL"), Cell::new(&config.server.url)]);
            table.add_row(vec![Cell::new("User"), Cell::new(&config.server.user_id)]);
            table.add_row(vec![Cell::new("API key"), Cell::new(secret(credentials.get_server_api_key()))]);
            table.add_row(vec![Cell::new("Expected identity"), Cell::new(&config.server.expected_identity)]);
            table.add_row(vec![Cell::new("Abort when unreachable"), flag(config.server.abort_on_unreachable)]);
            println!("{}\n", table);

            let mut table = section_table("Metadata Provider");
            table.add_row(vec![Cell::new("Enabled"), flag(config.metadata.enabled)]);
            table.add_row(vec![Cell::new("Base URL"), Cell::new(&config.metadata.base_url)]);
            table.add_row(vec![Cell::new("API key"), Cell::new(secret(credentials.get_metadata_api_key()))]);
            println!("{}\n", table);

            let mut table = section_table("Sync");
            table.add_row(vec![Cell::new("Page size"), Cell::new(config.sync.page_size)]);
            table.add_row(vec![Cell::new("Box set limit"), Cell::new(config.sync.box_set_limit)]);
            table.add_row(vec![Cell::new("Statistics"), flag(config.sync.statistics)]);
            table.add_row(vec![
                Cell::new("Movie library types"),
                Cell::new(
                    config.sync.movie_library_types.iter().map(|t| t.as_collection_type()).collect::<Vec<_>>().join(", "),
                ),
            ]);
            table.add_row(vec![
                Cell::new("Show library types"),
                Cell::new(
                    config.sync.show_library_types.iter().map(|t| t.as_collection_type()).collect::<Vec<_>>().join(", "),
                ),
            ]);
            println!("{}\n", table);

            if let Some(scheduler) = &config.scheduler {
                let mut table = section_table("Scheduler");
                table.add_row(vec![Cell::new("Schedule"), Cell::new(&scheduler.schedule)]);
                table.add_row(vec![Cell::new("Run on startup"), flag(scheduler.run_on_startup)]);
                println!("{}\n", table);
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file.display().to_string(),
                "config": config,
                "credentials": {
                    "server_api_key": secret(credentials.get_server_api_key()),
                    "metadata_api_key": secret(credentials.get_metadata_api_key()),
                },
            }));
        }
    }
    Ok(())
}

fn section_table(title: &str) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    table
}

fn flag(value: bool) -> Cell {
    Cell::new(if value { "✓".green().to_string() } else { "✗".red().to_string() })
}

/// Existing config, or a fresh one when nothing has been saved yet
fn load_or_new(config_file: &std::path::PathBuf, url: &str, user_id: &str) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::new(url.to_string(), user_id.to_string()));
    }
    Config::load_from_file(config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

fn load_existing(path_manager: &PathManager, output: &Output) -> Result<Option<Config>> {
    let config_file = path_manager.config_file();
    if !config_file.exists() {
        output.warn("Configuration file not found. Run 'mediastat config server' first.");
        return Ok(None);
    }
    let config = Config::load_from_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    Ok(Some(config))
}

fn save_config(config: &Config, path_manager: &PathManager) -> Result<()> {
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;
    let config_file = path_manager.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save config to {}: {}", config_file.display(), e))
}

fn save_credentials(credentials: &CredentialStore) -> Result<()> {
    credentials
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials: {}", e))
}

fn prompt_secret(prompt: &str) -> Result<String> {
    let value = rpassword::prompt_password(prompt)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(color_eyre::eyre::eyre!("A value is required"));
    }
    Ok(value)
}

fn configure_server(
    url: String,
    user_id: String,
    api_key: Option<String>,
    abort_on_unreachable: Option<bool>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create config directories: {}", e))?;

    let mut config = load_or_new(&path_manager.config_file(), &url, &user_id)?;
    config.server.url = url.trim_end_matches('/').to_string();
    config.server.user_id = user_id;
    if let Some(abort) = abort_on_unreachable {
        config.server.abort_on_unreachable = abort;
    }
    save_config(&config, &path_manager)?;

    let mut credentials = load_credentials(&path_manager)?;
    let api_key = match api_key {
        Some(key) => key,
        None => prompt_secret("Media server API key: ")?,
    };
    credentials.set_server_api_key(api_key);
    save_credentials(&credentials)?;

    output.success(format!("Media server configured: {}", config.server.url));
    Ok(())
}

fn configure_metadata(
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    let Some(mut config) = load_existing(&path_manager, output)? else {
        return Ok(());
    };

    if let Some(enabled) = enabled {
        config.metadata.enabled = enabled;
    }
    if let Some(base_url) = base_url {
        config.metadata.base_url = base_url.trim_end_matches('/').to_string();
    }
    save_config(&config, &path_manager)?;

    let mut credentials = load_credentials(&path_manager)?;
    let key = match api_key {
        Some(key) => Some(key),
        None if config.metadata.enabled && credentials.get_metadata_api_key().is_none() => {
            Some(prompt_secret("Metadata provider API key: ")?)
        }
        None => None,
    };
    if let Some(key) = key {
        credentials.set_metadata_api_key(key);
        save_credentials(&credentials)?;
    }

    if config.metadata.enabled {
        output.success(format!("Metadata provider enabled: {}", config.metadata.base_url));
    } else {
        output.success("Metadata provider disabled; missing episodes will not be detected");
    }
    Ok(())
}

fn configure_sync(
    page_size: Option<u32>,
    box_set_limit: Option<u32>,
    statistics: Option<bool>,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    let Some(mut config) = load_existing(&path_manager, output)? else {
        return Ok(());
    };

    if page_size.is_none() && box_set_limit.is_none() && statistics.is_none() {
        output.warn("No sync option given. Use --page-size, --box-set-limit or --statistics");
        return Ok(());
    }
    if let Some(page_size) = page_size {
        config.sync.page_size = page_size;
    }
    if let Some(limit) = box_set_limit {
        config.sync.box_set_limit = limit;
    }
    if let Some(statistics) = statistics {
        config.sync.statistics = statistics;
    }
    save_config(&config, &path_manager)?;

    output.success(format!(
        "Sync options saved (page size {}, box set limit {}, statistics {})",
        config.sync.page_size,
        config.sync.box_set_limit,
        if config.sync.statistics { "on" } else { "off" }
    ));
    Ok(())
}
