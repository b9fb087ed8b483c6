use media_stat_config::Config;
use media_stat_models::StatisticKind;
use media_stat_sources::{MediaServerClient, MetadataProvider};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use crate::context::{ProgressBand, RunContext};
use crate::error::{Result, SyncError};
use crate::libraries::LibraryFetcher;
use crate::movies::MovieSync;
use crate::reconcile::{EpisodeReconciler, ReconcileSummary};
use crate::shows::ShowSync;
use crate::statistics::StatisticsEngine;
use crate::store::Repositories;

const MOVIE_STATISTICS: ProgressBand = ProgressBand::new(85.0, 93.0);
const SHOW_STATISTICS: ProgressBand = ProgressBand::new(93.0, 100.0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub libraries: usize,
    pub movies: usize,
    pub shows: usize,
    pub episodes: usize,
    pub reconciled_shows: usize,
    pub failed_shows: usize,
    pub missing_episodes: usize,
    pub statistic_rows: usize,
    pub duration: Duration,
}

/// Clears the in-progress flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs libraries, movies, shows, reconciliation and statistics in order, one run at a time
pub struct SyncOrchestrator {
    client: Arc<dyn MediaServerClient>,
    repositories: Repositories,
    config: Config,
    reconciler: Option<EpisodeReconciler>,
    running: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(client: Arc<dyn MediaServerClient>, repositories: Repositories, config: Config) -> Self {
        Self {
            client,
            repositories,
            config,
            reconciler: None,
            running: AtomicBool::new(false),
        }
    }

    /// Enable missing-episode detection against a metadata provider
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>, api_key: impl Into<String>) -> Self {
        self.reconciler = Some(EpisodeReconciler::new(
            provider,
            self.repositories.shows.clone(),
            self.repositories.watermark.clone(),
            api_key,
        ));
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Execute one full sync; rejected with [`SyncError::AlreadyRunning`] while another is active
    pub async fn run(&self, ctx: &RunContext) -> Result<SyncReport> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!("Sync requested while another run is in progress, ignoring");
            return Err(SyncError::AlreadyRunning);
        };

        match self.execute(ctx).await {
            Ok(report) => {
                ctx.info(format!(
                    "Sync finished in {:.1}s: {} movies, {} shows, {} missing episodes",
                    report.duration.as_secs_f64(),
                    report.movies,
                    report.shows,
                    report.missing_episodes
                ));
                ctx.finished(true);
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    ctx.warn("Sync cancelled");
                } else {
                    ctx.error(format!("Sync failed: {}", e));
                }
                ctx.finished(false);
                Err(e)
            }
        }
    }

    #[instrument(skip_all)]
    async fn execute(&self, ctx: &RunContext) -> Result<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport::default();
        let settings = &self.config.sync;

        ctx.info("Starting media server sync");
        self.check_server(ctx).await?;
        ctx.progress(3.0);

        ctx.info("Fetching libraries");
        let libraries = LibraryFetcher::new(self.client.clone()).fetch_libraries().await?;
        self.repositories.libraries.replace_libraries(&libraries)?;
        report.libraries = libraries.len();
        ctx.progress(15.0);

        ctx.checkpoint()?;
        ctx.info("Syncing movies");
        let movies = MovieSync::new(self.client.clone(), self.repositories.movies.clone(), settings.clone())
            .sync(&libraries, ctx)
            .await?;
        report.movies = movies.movies;
        ctx.progress(35.0);

        ctx.checkpoint()?;
        ctx.info("Syncing shows");
        let shows = ShowSync::new(self.client.clone(), self.repositories.shows.clone(), settings.clone())
            .sync(&libraries, ctx)
            .await?;
        report.shows = shows.shows;
        report.episodes = shows.episodes;
        ctx.progress(55.0);

        ctx.checkpoint()?;
        let reconciled = match &self.reconciler {
            Some(reconciler) => {
                ctx.info("Looking for missing episodes");
                match reconciler.reconcile(&shows.previous, ctx).await {
                    Ok(summary) => summary,
                    // provider unavailable: missing episodes from earlier passes were kept by the show phase
                    Err(SyncError::Metadata(e)) => {
                        ctx.error(format!("Missing episode detection skipped: {}", e));
                        ReconcileSummary::default()
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                ctx.warn("No metadata provider configured, skipping missing episode detection");
                ReconcileSummary::default()
            }
        };
        report.reconciled_shows = reconciled.reconciled;
        report.failed_shows = reconciled.failed;
        report.missing_episodes = reconciled.missing_episodes;
        ctx.progress(85.0);

        if settings.statistics {
            ctx.checkpoint()?;
            ctx.info("Calculating statistics");
            let engine = StatisticsEngine::new(
                self.repositories.movies.clone(),
                self.repositories.shows.clone(),
                self.repositories.statistics.clone(),
            );
            let movie_ids: Vec<String> = libraries
                .iter()
                .filter(|l| settings.is_movie_library(l.library_type))
                .map(|l| l.id.clone())
                .collect();
            let show_ids: Vec<String> = libraries
                .iter()
                .filter(|l| settings.is_show_library(l.library_type))
                .map(|l| l.id.clone())
                .collect();
            report.statistic_rows += engine.recalculate(StatisticKind::Movie, &movie_ids, MOVIE_STATISTICS, ctx)?;
            ctx.progress(MOVIE_STATISTICS.end);
            report.statistic_rows += engine.recalculate(StatisticKind::Show, &show_ids, SHOW_STATISTICS, ctx)?;
        }
        ctx.progress(100.0);

        report.duration = start.elapsed();
        info!(
            libraries = report.libraries,
            movies = report.movies,
            shows = report.shows,
            missing_episodes = report.missing_episodes,
            statistic_rows = report.statistic_rows,
            "Sync complete"
        );
        Ok(report)
    }

    /// Ping the server; an unexpected answer warns, or aborts when configured to
    async fn check_server(&self, ctx: &RunContext) -> Result<()> {
        let server = &self.config.server;
        let problem = match self.client.ping().await {
            Ok(identity) if identity == server.expected_identity => return Ok(()),
            Ok(identity) => format!("unexpected identity '{}'", identity),
            Err(e) => e.to_string(),
        };

        if server.abort_on_unreachable {
            return Err(SyncError::ServerUnreachable(format!("{} ({})", server.url, problem)));
        }
        ctx.warn(format!(
            "Media server at {} did not answer as expected ({}), continuing anyway",
            server.url, problem
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LogLevel;
    use crate::store::CatalogStore;
    use crate::store::{MovieRepository, ShowRepository, StatisticsRepository, WatermarkRepository};
    use crate::testing::{
        box_set_item, episode_item, library_item, movie_item, record, season_item, series_item,
        FakeMediaServer, FakeProvider, RecordingSink,
    };
    use tokio_util::sync::CancellationToken;

    fn server() -> FakeMediaServer {
        FakeMediaServer::new(
            vec![
                library_item("lib1", Some("movies")),
                library_item("lib2", Some("tvshows")),
                library_item("lib3", Some("boxsets")),
            ],
            vec![
                movie_item("m1", "lib1"),
                movie_item("m2", "lib1"),
                box_set_item("bs1", "lib1"),
                movie_item("m3", "bs1"),
                series_item("s1", "lib2", Some("100")),
                season_item("s1-1", "s1", 1),
                episode_item("e1", "s1", "s1-1", 1, Some(100)),
            ],
        )
    }

    fn provider() -> FakeProvider {
        FakeProvider::default().with_episodes(
            "100",
            vec![record("r1", 1, 1, Some("2001-01-01")), record("r2", 1, 2, Some("2001-01-08"))],
        )
    }

    fn config() -> Config {
        Config::new("http://localhost:8096".to_string(), "user1".to_string())
    }

    fn orchestrator(server: FakeMediaServer, store: &Arc<CatalogStore>, config: Config) -> SyncOrchestrator {
        SyncOrchestrator::new(Arc::new(server), Repositories::from_store(store.clone()), config)
    }

    fn recording() -> (Arc<RecordingSink>, RunContext) {
        let sink = Arc::new(RecordingSink::default());
        let ctx = RunContext::new(sink.clone(), CancellationToken::new());
        (sink, ctx)
    }

    #[tokio::test]
    async fn test_full_run() {
        let store = Arc::new(CatalogStore::new());
        let orchestrator = orchestrator(server(), &store, config())
            .with_metadata_provider(Arc::new(provider()), "key");
        let (sink, ctx) = recording();

        let report = orchestrator.run(&ctx).await.unwrap();

        assert_eq!(report.libraries, 2);
        assert_eq!(report.movies, 3);
        assert_eq!(report.shows, 1);
        assert_eq!(report.missing_episodes, 1);
        assert_eq!(report.statistic_rows, 4);
        assert_eq!(store.movies(&[]).unwrap().len(), 3);
        assert_eq!(store.statistics(StatisticKind::Show).unwrap().len(), 2);
        assert!(store.show_by_id("s1").unwrap().unwrap().metadata_synced);
        assert!(store.last_update().unwrap().is_some());

        let progress = sink.progress();
        for milestone in [3.0, 15.0, 35.0, 55.0, 85.0, 100.0] {
            assert!(progress.contains(&milestone), "missing milestone {}", milestone);
        }
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sink.finished(), Some(true));
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_concurrent_run_rejected() {
        let store = Arc::new(CatalogStore::new());
        let orchestrator = orchestrator(server(), &store, config());

        let guard = RunGuard::acquire(&orchestrator.running);
        assert!(guard.is_some());
        assert!(orchestrator.is_running());
        let err = orchestrator.run(&RunContext::detached()).await.unwrap_err();
        assert!(matches!(err, SyncError::AlreadyRunning));

        drop(guard);
        assert!(orchestrator.run(&RunContext::detached()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_warns_by_default() {
        let mut server = server();
        server.identity = None;
        let store = Arc::new(CatalogStore::new());
        let (sink, ctx) = recording();

        orchestrator(server, &store, config()).run(&ctx).await.unwrap();

        assert!(sink.logs(LogLevel::Warning).iter().any(|m| m.contains("did not answer")));
        assert_eq!(sink.finished(), Some(true));
    }

    #[tokio::test]
    async fn test_unreachable_server_aborts_when_configured() {
        let mut server = server();
        server.identity = Some("Something Else".to_string());
        let mut config = config();
        config.server.abort_on_unreachable = true;
        let store = Arc::new(CatalogStore::new());
        let (sink, ctx) = recording();

        let orchestrator = orchestrator(server, &store, config);
        let err = orchestrator.run(&ctx).await.unwrap_err();

        assert!(matches!(err, SyncError::ServerUnreachable(_)));
        assert!(sink.progress().is_empty());
        assert_eq!(sink.finished(), Some(false));
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_run() {
        let mut server = server();
        server.failing_parents.insert("lib2".to_string());
        let store = Arc::new(CatalogStore::new());
        let (sink, ctx) = recording();

        let err = orchestrator(server, &store, config()).run(&ctx).await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(sink.progress().last().copied(), Some(35.0));
        assert_eq!(sink.logs(LogLevel::Error).len(), 1);
        assert_eq!(sink.finished(), Some(false));
        // movies written before the failure stay
        assert_eq!(store.movies(&[]).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_without_provider_skips_reconciliation() {
        let store = Arc::new(CatalogStore::new());
        let mut config = config();
        config.sync.statistics = false;
        let (sink, ctx) = recording();

        let report = orchestrator(server(), &store, config).run(&ctx).await.unwrap();

        assert_eq!(report.missing_episodes, 0);
        assert_eq!(report.statistic_rows, 0);
        assert!(sink.logs(LogLevel::Warning).iter().any(|m| m.contains("skipping")));
        assert!(store.statistics(StatisticKind::Movie).unwrap().is_empty());
        assert_eq!(sink.progress().last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn test_missing_episodes_survive_provider_outage() {
        let store = Arc::new(CatalogStore::new());
        let missing = |store: &Arc<CatalogStore>| store.show_by_id("s1").unwrap().unwrap().missing_episode_count();

        orchestrator(server(), &store, config())
            .with_metadata_provider(Arc::new(provider()), "key")
            .run(&RunContext::detached())
            .await
            .unwrap();
        assert_eq!(missing(&store), 1);

        let mut rejecting = provider();
        rejecting.reject_login = true;
        let (sink, ctx) = recording();
        let report = orchestrator(server(), &store, config())
            .with_metadata_provider(Arc::new(rejecting), "key")
            .run(&ctx)
            .await
            .unwrap();
        assert_eq!(missing(&store), 1);
        assert_eq!(report.missing_episodes, 0);
        assert_eq!(report.statistic_rows, 4);
        assert!(sink.logs(LogLevel::Error).iter().any(|m| m.contains("Missing episode detection skipped")));
        assert_eq!(sink.finished(), Some(true));

        let report = orchestrator(server(), &store, config())
            .with_metadata_provider(Arc::new(provider()), "key")
            .run(&RunContext::detached())
            .await
            .unwrap();
        assert_eq!(report.reconciled_shows, 0);
        assert_eq!(missing(&store), 1);

        orchestrator(server(), &store, config()).run(&RunContext::detached()).await.unwrap();
        assert_eq!(missing(&store), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_failure() {
        let store = Arc::new(CatalogStore::new());
        let (sink, ctx) = recording();
        ctx.cancellation_token().cancel();

        let err = orchestrator(server(), &store, config()).run(&ctx).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(sink.finished(), Some(false));
        assert!(sink.logs(LogLevel::Error).is_empty());
    }
}
