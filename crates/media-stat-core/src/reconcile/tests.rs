use super::*;
use crate::context::LogLevel;
use crate::store::CatalogStore;
use crate::testing::{disk_episode, record, season, show, FakeProvider, RecordingSink};
use chrono::TimeZone;
use media_stat_models::EpisodeRecord;
use tokio_util::sync::CancellationToken;

const AIRED: Option<&str> = Some("2001-01-01");

/// Show with disk seasons and episodes given as (season, index, index_end)
fn build(id: &str, tvdb: Option<&str>, episodes: &[(i32, i32, Option<i32>)]) -> Show {
    let mut s = show(id, "lib1", tvdb);
    for &(season_number, index, end) in episodes {
        let season_id = format!("{}-{}", id, season_number);
        if !s.seasons.iter().any(|x| x.id == season_id) {
            s.seasons.push(season(id, &season_id, season_number));
        }
        let episode_id = format!("{}-e{}-{}", id, season_number, index);
        s.episodes.push(disk_episode(id, &season_id, &episode_id, index, end));
    }
    s
}

fn put(store: &CatalogStore, show: &Show) {
    store.insert_seasons(&show.seasons).unwrap();
    store.insert_episodes(&show.episodes).unwrap();
    store.insert_show(show).unwrap();
}

fn reconciler(provider: &Arc<FakeProvider>, store: &Arc<CatalogStore>) -> EpisodeReconciler {
    EpisodeReconciler::new(provider.clone(), store.clone(), store.clone(), "key")
}

fn aired(id: &str, season_number: i32, episode: i32) -> EpisodeRecord {
    record(id, season_number, episode, AIRED)
}

#[tokio::test]
async fn test_gap_detection_respects_spans() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 5, None), (1, 10, Some(12))]));
    let provider = Arc::new(FakeProvider::default().with_episodes(
        "100",
        vec![
            aired("r5", 1, 5),
            aired("r11", 1, 11),
            aired("r8", 1, 8),
            aired("r8b", 1, 8),
            aired("r201", 2, 1),
        ],
    ));

    let summary = reconciler(&provider, &store)
        .reconcile(&[], &RunContext::detached())
        .await
        .unwrap();

    assert_eq!(summary.missing_episodes, 2);
    assert_eq!(summary.reconciled, 1);
    let a = store.show_by_id("a").unwrap().unwrap();
    assert!(a.metadata_synced);
    assert_eq!(a.missing_episode_count(), 2);
    assert!(store.episode_by_id("a-tvdb-r8").unwrap().is_some());
    assert!(store.episode_by_id("a-tvdb-r5").unwrap().is_none());
    assert!(store.episode_by_id("a-tvdb-r11").unwrap().is_none());

    let created = store.season_by_id("a-season-2").unwrap().unwrap();
    assert_eq!(created.location_type, LocationType::Virtual);
    assert_eq!(
        store.episode_by_id("a-tvdb-r201").unwrap().unwrap().season_id,
        "a-season-2"
    );
    assert_eq!(provider.logins.lock().unwrap().as_slice(), ["key".to_string()]);
}

#[tokio::test]
async fn test_unaired_episodes_never_missing() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 1, None)]));
    let provider = Arc::new(FakeProvider::default().with_episodes(
        "100",
        vec![
            record("future", 1, 20, Some("2999-01-01")),
            record("none", 1, 21, None),
            record("empty", 1, 22, Some("")),
            record("garbage", 1, 23, Some("not a date")),
            record("zero", 1, 24, Some("0000-00-00")),
            record("past", 1, 25, AIRED),
        ],
    ));

    let summary = reconciler(&provider, &store)
        .reconcile(&[], &RunContext::detached())
        .await
        .unwrap();

    assert_eq!(summary.missing_episodes, 1);
    assert!(store.episode_by_id("a-tvdb-past").unwrap().is_some());
}

#[tokio::test]
async fn test_not_found_marks_failed_and_continues() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 1, None)]));
    put(&store, &build("b", Some("200"), &[(1, 1, None)]));
    put(&store, &build("c", Some("300"), &[(1, 1, None)]));
    let mut provider = FakeProvider::default()
        .with_episodes("100", vec![aired("x1", 1, 2)])
        .with_episodes("300", vec![aired("x3", 1, 2)]);
    provider.not_found.insert("200".to_string());
    let provider = Arc::new(provider);
    let sink = Arc::new(RecordingSink::default());
    let ctx = RunContext::new(sink.clone(), CancellationToken::new());

    let summary = reconciler(&provider, &store).reconcile(&[], &ctx).await.unwrap();

    assert_eq!(provider.requested(), vec!["100", "200", "300"]);
    assert_eq!(summary.reconciled, 2);
    assert_eq!(summary.failed, 1);
    let b = store.show_by_id("b").unwrap().unwrap();
    assert!(b.metadata_failed);
    assert!(!b.metadata_synced);
    assert!(store.show_by_id("c").unwrap().unwrap().metadata_synced);
    assert_eq!(sink.logs(LogLevel::Warning).len(), 1);
    assert!(sink.logs(LogLevel::Error).is_empty());
    assert_eq!(sink.progress(), vec![65.0, 75.0, 85.0]);
}

#[tokio::test]
async fn test_other_errors_are_isolated() {
    let store = Arc::new(CatalogStore::new());
    let mut synced = build("a", Some("100"), &[(1, 1, None)]);
    synced.metadata_synced = true;
    put(&store, &synced);
    put(&store, &build("b", Some("200"), &[(1, 1, None)]));
    let mut provider = FakeProvider::default().with_episodes("200", vec![aired("y", 1, 2)]);
    provider.failing.insert("100".to_string());
    let provider = Arc::new(provider);
    let sink = Arc::new(RecordingSink::default());
    let ctx = RunContext::new(sink.clone(), CancellationToken::new());

    // "a" was synced before but is new relative to the empty previous catalog
    let summary = reconciler(&provider, &store).reconcile(&[], &ctx).await.unwrap();

    assert_eq!(summary.failed, 1);
    let a = store.show_by_id("a").unwrap().unwrap();
    assert!(a.metadata_failed);
    assert!(a.metadata_synced);
    assert_eq!(sink.logs(LogLevel::Error).len(), 1);
    assert_eq!(store.show_by_id("b").unwrap().unwrap().missing_episode_count(), 1);
}

#[tokio::test]
async fn test_login_failure_is_fatal() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 1, None)]));
    let provider = Arc::new(FakeProvider {
        reject_login: true,
        ..FakeProvider::default()
    });

    let err = reconciler(&provider, &store)
        .reconcile(&[], &RunContext::detached())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Metadata(_)));
    assert!(provider.requested().is_empty());
    assert_eq!(store.last_update().unwrap(), None);
}

fn synced(id: &str, tvdb: &str, episodes: &[(i32, i32, Option<i32>)]) -> Show {
    let mut s = build(id, Some(tvdb), episodes);
    s.metadata_synced = true;
    s
}

#[tokio::test]
async fn test_selection_with_watermark() {
    let store = Arc::new(CatalogStore::new());
    let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    store.set_last_update(Some(since)).unwrap();

    let a = synced("a", "100", &[(1, 1, None)]);
    let b_old = synced("b", "200", &[(1, 1, None)]);
    let b = synced("b", "200", &[(1, 1, None), (1, 2, None)]);
    let c = synced("c", "300", &[(1, 1, None)]);
    let mut d = build("d", None, &[(1, 1, None)]);
    d.metadata_synced = false;
    for s in [&a, &b, &c, &d] {
        put(&store, s);
    }
    let previous = vec![a.clone(), b_old, c.clone(), d.clone()];

    let provider = Arc::new(FakeProvider {
        changed: vec!["300".to_string(), "999".to_string()],
        ..FakeProvider::default()
    });

    let summary = reconciler(&provider, &store)
        .reconcile(&previous, &RunContext::detached())
        .await
        .unwrap();

    assert_eq!(provider.requested(), vec!["200", "300"]);
    assert_eq!(summary.selected, 2);
    assert_eq!(provider.changed_since.lock().unwrap().as_slice(), [since]);
    assert!(store.last_update().unwrap().unwrap() > since);
}

#[tokio::test]
async fn test_no_watermark_skips_provider_changes() {
    let store = Arc::new(CatalogStore::new());
    let a = synced("a", "100", &[(1, 1, None)]);
    put(&store, &a);
    let provider = Arc::new(FakeProvider {
        changed: vec!["100".to_string()],
        ..FakeProvider::default()
    });

    let summary = reconciler(&provider, &store)
        .reconcile(&[a], &RunContext::detached())
        .await
        .unwrap();

    assert_eq!(summary.selected, 0);
    assert!(provider.requested().is_empty());
    assert!(provider.changed_since.lock().unwrap().is_empty());
    assert!(store.last_update().unwrap().is_some());
}

#[tokio::test]
async fn test_deduplicated_by_external_id() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 1, None)]));
    put(&store, &build("b", Some(" 100 "), &[(1, 1, None)]));
    let provider = Arc::new(FakeProvider::default());

    let summary = reconciler(&provider, &store)
        .reconcile(&[], &RunContext::detached())
        .await
        .unwrap();

    assert_eq!(summary.selected, 1);
    assert_eq!(provider.requested(), vec!["100"]);
}

#[tokio::test]
async fn test_existing_virtual_episodes_not_duplicated() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 1, None)]));
    let provider = Arc::new(
        FakeProvider::default().with_episodes("100", vec![aired("r2", 1, 2), aired("r201", 2, 1)]),
    );
    let reconciler = reconciler(&provider, &store);
    let first = reconciler.reconcile(&[], &RunContext::detached()).await.unwrap();
    assert_eq!(first.missing_episodes, 2);

    // not in the previous catalog, so selected again with last pass's rows still present
    let second = reconciler.reconcile(&[], &RunContext::detached()).await.unwrap();

    assert_eq!(second.selected, 1);
    assert_eq!(second.failed, 0);
    assert_eq!(second.missing_episodes, 0);
    let a = store.show_by_id("a").unwrap().unwrap();
    assert_eq!(a.missing_episode_count(), 2);
    assert_eq!(a.seasons.len(), 2);
}

#[tokio::test]
async fn test_cancellation_stops_before_next_show() {
    let store = Arc::new(CatalogStore::new());
    put(&store, &build("a", Some("100"), &[(1, 1, None)]));
    let provider = Arc::new(FakeProvider::default());
    let token = CancellationToken::new();
    token.cancel();
    let ctx = RunContext::new(Arc::new(RecordingSink::default()), token);

    let err = reconciler(&provider, &store).reconcile(&[], &ctx).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(provider.requested().is_empty());
    assert_eq!(store.last_update().unwrap(), None);
}

#[test]
fn test_structure_ignores_virtual_and_order() {
    let mut a = build("a", Some("100"), &[(1, 1, None), (1, 2, None)]);
    let mut b = a.clone();
    b.episodes.reverse();
    b.episodes.push(convert::missing_episode(&aired("r3", 1, 3), "a", "a-1"));
    assert_eq!(structure(&a), structure(&b));

    a.episodes.pop();
    assert_ne!(structure(&a), structure(&b));
}
