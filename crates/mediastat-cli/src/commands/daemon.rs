use super::{load_config, load_credentials, SyncRuntime};
use crate::output::Output;
use color_eyre::Result;
use media_stat_config::PathManager;
use media_stat_core::{NullSink, RunContext, SyncError};
use std::future::Future;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cron-driven sync loop sharing one catalog across runs
pub struct Scheduler {
    scheduler: JobScheduler,
    runtime: Arc<SyncRuntime>,
    shutdown: CancellationToken,
    schedule: String,
    run_on_startup: bool,
}

impl Scheduler {
    pub async fn new(runtime: SyncRuntime, schedule: String, run_on_startup: bool) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            runtime: Arc::new(runtime),
            shutdown: CancellationToken::new(),
            schedule,
            run_on_startup,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        self.start_with(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(operation = "signal_error", error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `interrupt` resolves; it is watched from the start, so it also cancels the startup sync
    pub async fn start_with<F>(&mut self, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let signal = self.shutdown.clone();
        tokio::spawn(async move {
            interrupt.await;
            info!(operation = "scheduler_shutdown", "Shutdown requested, cancelling active sync");
            signal.cancel();
        });

        if self.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial sync on startup");
            run_once(&self.runtime, &self.shutdown).await;
            if self.shutdown.is_cancelled() {
                return Ok(());
            }
        }

        let runtime = self.runtime.clone();
        let shutdown = self.shutdown.clone();
        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let runtime = runtime.clone();
            let shutdown = shutdown.clone();
            Box::pin(async move {
                run_once(&runtime, &shutdown).await;
            })
        })
        .map_err(|e| color_eyre::eyre::eyre!("Invalid schedule '{}': {}", self.schedule, e))?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            operation = "scheduler_started",
            schedule = %self.schedule,
            "Scheduler started"
        );

        self.shutdown.cancelled().await;
        self.scheduler.shutdown().await?;

        // a run interrupted mid-way still leaves a consistent catalog worth keeping
        if let Err(e) = self.runtime.save() {
            error!(operation = "snapshot_save_error", error = %e, "Failed to save catalog on shutdown");
        }
        Ok(())
    }
}

async fn run_once(runtime: &SyncRuntime, shutdown: &CancellationToken) {
    info!(operation = "scheduled_sync_start", "Starting scheduled sync");
    let ctx = RunContext::new(Arc::new(NullSink), shutdown.child_token());

    match runtime.orchestrator.run(&ctx).await {
        Ok(report) => {
            info!(
                operation = "scheduled_sync_complete",
                movies = report.movies,
                shows = report.shows,
                missing_episodes = report.missing_episodes,
                statistic_rows = report.statistic_rows,
                duration_ms = report.duration.as_millis() as u64,
                "Scheduled sync completed successfully"
            );
        }
        Err(SyncError::AlreadyRunning) => {
            warn!(operation = "scheduled_sync_skipped", "Previous sync still running, skipping this trigger");
            return;
        }
        Err(e) => {
            error!(operation = "scheduled_sync_error", error = %e, "Scheduled sync failed");
        }
    }

    if let Err(e) = runtime.save() {
        error!(operation = "snapshot_save_error", error = %e, "Failed to save catalog");
    }
}

pub async fn run_daemon(schedule_override: Option<String>, no_startup_sync: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create data directories: {}", e))?;
    let config = load_config(&path_manager)?;
    let credentials = load_credentials(&path_manager)?;

    let defaults = media_stat_config::default_scheduler_config();
    let scheduler_config = config.scheduler.as_ref().unwrap_or(&defaults);
    let schedule = schedule_override.unwrap_or_else(|| scheduler_config.schedule.clone());
    let run_on_startup = !no_startup_sync && scheduler_config.run_on_startup;

    let runtime = SyncRuntime::build(&config, &credentials, &path_manager, output)?;
    output.info(format!(
        "Daemon running with schedule '{}'. Logs are written to {}",
        schedule,
        config
            .logging
            .file
            .clone()
            .unwrap_or_else(|| path_manager.daemon_log_file())
            .display()
    ));

    let mut scheduler = Scheduler::new(runtime, schedule, run_on_startup)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create scheduler: {}", e))?;
    scheduler.start().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_stat_config::Config;
    use media_stat_core::{CatalogStore, Repositories, SnapshotStorage, SyncOrchestrator};
    use media_stat_sources::EmbyClient;
    use tempfile::TempDir;

    fn runtime(dir: &TempDir) -> SyncRuntime {
        // nothing listens on the discard port, so every request fails fast
        let config = Config::new("http://127.0.0.1:9".to_string(), "user1".to_string());
        let client = EmbyClient::new(&config.server.url, &config.server.user_id, "key").unwrap();
        let store = Arc::new(CatalogStore::new());
        SyncRuntime {
            orchestrator: SyncOrchestrator::new(Arc::new(client), Repositories::from_store(store.clone()), config),
            store,
            snapshot: SnapshotStorage::new(dir.path().join("catalog.bin")),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_interrupt_during_startup_sync_saves_catalog() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("catalog.bin");
        let mut scheduler = Scheduler::new(runtime(&dir), "0 0 */6 * * *".to_string(), true)
            .await
            .unwrap();

        let finished = tokio::time::timeout(std::time::Duration::from_secs(30), scheduler.start_with(async {}))
            .await
            .expect("scheduler should stop once interrupted");

        assert!(finished.is_ok());
        assert!(scheduler.shutdown.is_cancelled());
        assert!(snapshot.exists());
    }
}
