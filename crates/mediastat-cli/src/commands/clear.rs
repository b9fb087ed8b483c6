use crate::output::Output;
use color_eyre::Result;
use media_stat_config::PathManager;
use media_stat_core::store::WatermarkRepository;
use media_stat_core::SnapshotStorage;
use std::fs;

pub fn run_clear(all: bool, catalog: bool, credentials: bool, watermark: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    if all {
        clear_catalog(&path_manager, output)?;
        clear_credentials(&path_manager, output)?;
        output.success("Catalog and credentials cleared");
        return Ok(());
    }

    let mut cleared_anything = false;

    // watermark first: clearing the catalog would make it moot
    if watermark {
        clear_watermark(&path_manager, output)?;
        cleared_anything = true;
    }

    if catalog {
        clear_catalog(&path_manager, output)?;
        cleared_anything = true;
    }

    if credentials {
        clear_credentials(&path_manager, output)?;
        cleared_anything = true;
    }

    if !cleared_anything {
        output.warn("No clear option specified. Use --catalog, --credentials, --watermark, or --all");
        output.info("\nExample: mediastat clear --watermark");
    }

    Ok(())
}

fn clear_catalog(path_manager: &PathManager, output: &Output) -> Result<()> {
    let snapshot = SnapshotStorage::new(path_manager.catalog_file());
    if snapshot.clear()? {
        output.success(format!("Cleared catalog: {}", snapshot.path().display()));
    } else {
        output.info("No catalog found to clear");
    }
    Ok(())
}

fn clear_credentials(path_manager: &PathManager, output: &Output) -> Result<()> {
    let credentials_file = path_manager.credentials_file();
    if credentials_file.exists() {
        fs::remove_file(&credentials_file).map_err(|e| {
            color_eyre::eyre::eyre!("Failed to remove credentials at {}: {}", credentials_file.display(), e)
        })?;
        output.success(format!("Cleared credentials: {}", credentials_file.display()));
    } else {
        output.info("No credentials found to clear");
    }
    Ok(())
}

fn clear_watermark(path_manager: &PathManager, output: &Output) -> Result<()> {
    let snapshot = SnapshotStorage::new(path_manager.catalog_file());
    if !snapshot.exists() {
        output.info("No catalog found, nothing to reset");
        return Ok(());
    }
    let store = snapshot.load()?;
    store.set_last_update(None)?;
    snapshot.save(&store)?;
    output.success("Metadata watermark reset; the next sync checks every show");
    Ok(())
}
