use super::progress::SyncProgress;
use super::{load_config, load_credentials, SyncRuntime};
use crate::output::{Output, OutputFormat};
use color_eyre::Result;
use media_stat_config::PathManager;
use media_stat_core::{ChannelSink, RunContext, SyncError};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run_sync(no_statistics: bool, output: &Output) -> Result<()> {
    tracing::debug!("Sync command started");

    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create data directories: {}", e))?;
    let mut config = load_config(&path_manager)?;
    if no_statistics {
        config.sync.statistics = false;
    }
    let credentials = load_credentials(&path_manager)?;
    let runtime = SyncRuntime::build(&config, &credentials, &path_manager, output)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let ctx = RunContext::new(Arc::new(ChannelSink::new(tx)), cancel.clone());

    let ui = tokio::spawn(SyncProgress::new(output.is_human() && !output.is_quiet()).drive(rx));
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling sync");
                cancel.cancel();
            }
        })
    };

    let result = runtime.orchestrator.run(&ctx).await;
    // closes the event channel so the progress task finishes
    drop(ctx);
    interrupt.abort();
    let _ = ui.await;

    // keep whatever was written, even by a failed or cancelled run
    runtime.save()?;
    info!("Catalog saved to {}", runtime.snapshot.path().display());

    let report = match result {
        Ok(report) => report,
        Err(SyncError::Cancelled) => {
            output.warn("Sync cancelled; partial results were saved");
            return Ok(());
        }
        Err(e) => return Err(color_eyre::eyre::eyre!("Sync failed: {}", e)),
    };

    match output.format() {
        OutputFormat::Human => {
            output.success(format!(
                "Sync completed in {:.1}s: {} libraries, {} movies, {} shows, {} episodes",
                report.duration.as_secs_f64(),
                report.libraries,
                report.movies,
                report.shows,
                report.episodes
            ));
            output.info(format!(
                "  Missing episodes added: {} ({} shows reconciled, {} failed)",
                report.missing_episodes, report.reconciled_shows, report.failed_shows
            ));
            output.info(format!("  Statistic rows: {}", report.statistic_rows));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "success": true,
                "libraries": report.libraries,
                "movies": report.movies,
                "shows": report.shows,
                "episodes": report.episodes,
                "reconciled_shows": report.reconciled_shows,
                "failed_shows": report.failed_shows,
                "missing_episodes": report.missing_episodes,
                "statistic_rows": report.statistic_rows,
                "duration_seconds": report.duration.as_secs_f64(),
            }));
        }
    }

    Ok(())
}
