//! Tests for HistoryStore
//!
//! Merge-on-write, size-bounded eviction, swallowed failures and reactive
//! snapshots.

use std::sync::Arc;

use chrono::Duration;
use davshelf_core::{Clock, DomainEvent, EventBus, HistoryConfig, HistoryRepository, HistoryStore};
use pretty_assertions::assert_eq;
use tests::fixtures::entry_at;
use tests::mocks::{ManualClock, MockHistoryRepository};

struct Fixture {
    store: HistoryStore,
    repo: Arc<MockHistoryRepository>,
    clock: Arc<ManualClock>,
    bus: EventBus,
}

fn fixture(max_items: usize) -> Fixture {
    tests::init_tracing();
    let repo = Arc::new(MockHistoryRepository::new());
    let clock = Arc::new(ManualClock::at_epoch_offset(0));
    let bus = EventBus::new();
    let config = HistoryConfig {
        max_items,
        ..HistoryConfig::default()
    };
    let store = HistoryStore::new(repo.clone(), clock.clone(), config, bus.sender());
    Fixture {
        store,
        repo,
        clock,
        bus,
    }
}

#[tokio::test]
async fn repeated_record_keeps_one_row_with_first_id() {
    let f = fixture(100);

    let first = f
        .store
        .record(entry_at("s1", "/base/x.mp4", f.clock.now()).with_progress(10_000, 60_000))
        .await
        .expect("first record");

    let replayed_at = f.clock.advance(Duration::seconds(90));
    let second = f
        .store
        .record(entry_at("s1", "/base/x.mp4", f.clock.now()).with_progress(45_000, 60_000))
        .await
        .expect("second record");

    assert_eq!(second.id, first.id);

    let rows = f.repo.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, first.id);
    assert_eq!(rows[0].position_ms, 45_000);
    assert_eq!(rows[0].last_played, replayed_at);
}

#[tokio::test]
async fn merge_sets_last_played_to_now_not_caller_value() {
    let f = fixture(100);
    let start = f.clock.now();

    f.store.record(entry_at("s1", "/a.mp4", start)).await;
    let now = f.clock.advance(Duration::minutes(5));

    // Caller passes a stale timestamp on the second play
    let merged = f
        .store
        .record(entry_at("s1", "/a.mp4", start - Duration::days(1)))
        .await
        .unwrap();

    assert_eq!(merged.last_played, now);
}

#[tokio::test]
async fn same_path_on_different_servers_are_distinct() {
    let f = fixture(100);
    let now = f.clock.now();

    f.store.record(entry_at("s1", "/a.mp4", now)).await;
    f.store.record(entry_at("s2", "/a.mp4", now)).await;

    assert_eq!(f.store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn eviction_keeps_most_recent_rows() {
    let f = fixture(3);
    let base = f.clock.now();

    for i in 0..5 {
        let path = format!("/movies/{}.mp4", i);
        f.store
            .record(entry_at("s1", &path, base + Duration::minutes(i)))
            .await
            .unwrap();
        assert!(f.store.count().await.unwrap() <= 3);
    }

    let paths: Vec<_> = f.repo.snapshot().into_iter().map(|e| e.file_path).collect();
    assert_eq!(paths, vec!["/movies/4.mp4", "/movies/3.mp4", "/movies/2.mp4"]);
}

#[tokio::test]
async fn eviction_tie_keeps_newer_insertion() {
    let f = fixture(2);
    let same = f.clock.now();

    for path in ["/a.mp4", "/b.mp4", "/c.mp4"] {
        f.store.record(entry_at("s1", path, same)).await.unwrap();
    }

    let paths: Vec<_> = f.repo.snapshot().into_iter().map(|e| e.file_path).collect();
    assert_eq!(paths, vec!["/c.mp4", "/b.mp4"]);
}

#[tokio::test]
async fn eviction_emits_removed_count() {
    let f = fixture(1);
    let mut rx = f.bus.subscribe();
    let now = f.clock.now();

    f.store.record(entry_at("s1", "/a.mp4", now)).await;
    f.store
        .record(entry_at("s1", "/b.mp4", now + Duration::seconds(1)))
        .await;

    let events = rx.drain();
    assert!(events.contains(&DomainEvent::HistoryEvicted { removed: 1 }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, DomainEvent::HistoryRecorded { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn explicit_eviction_returns_removed() {
    let f = fixture(100);
    let base = f.clock.now();
    for i in 0..4 {
        f.store
            .record(entry_at("s1", &format!("/{}.mp4", i), base + Duration::seconds(i)))
            .await;
    }

    assert_eq!(f.store.evict(10).await, 0);
    assert_eq!(f.store.evict(1).await, 3);
    assert_eq!(f.store.current().len(), 1);
    assert_eq!(f.store.current()[0].file_path, "/3.mp4");
}

#[tokio::test]
async fn write_failures_are_swallowed() {
    let f = fixture(100);
    let stored = f.store.record(entry_at("s1", "/a.mp4", f.clock.now())).await.unwrap();

    f.repo.fail_writes(true);

    assert!(f.store.record(entry_at("s1", "/b.mp4", f.clock.now())).await.is_none());
    f.store.update(&stored.clone().with_progress(1, 2)).await;
    f.store.remove(&stored.id).await;
    f.store.remove_by_server("s1").await;
    assert_eq!(f.store.remove_played_before(f.clock.now() + Duration::days(1)).await, 0);

    f.repo.fail_writes(false);
    let rows = f.repo.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].position_ms, 0);
}

#[tokio::test]
async fn update_overwrites_without_merge() {
    let f = fixture(100);
    let stored = f.store.record(entry_at("s1", "/a.mp4", f.clock.now())).await.unwrap();

    let mut resumed = stored.clone().with_progress(30_000, 120_000);
    resumed.last_played = stored.last_played;
    f.store.update(&resumed).await;

    let current = f.store.current();
    assert_eq!(current, vec![resumed]);
}

#[tokio::test]
async fn remove_played_before_drops_old_rows() {
    let f = fixture(100);
    let base = f.clock.now();
    f.store.record(entry_at("s1", "/old.mp4", base - Duration::days(40))).await;
    f.store.record(entry_at("s1", "/new.mp4", base)).await;

    let removed = f.store.remove_played_before(base - Duration::days(30)).await;

    assert_eq!(removed, 1);
    let paths: Vec<_> = f.store.current().into_iter().map(|e| e.file_path).collect();
    assert_eq!(paths, vec!["/new.mp4"]);
}

#[tokio::test]
async fn views_filter_and_limit_the_snapshot() {
    let f = fixture(100);
    let base = f.clock.now();
    for i in 0..4 {
        f.store
            .record(entry_at("s1", &format!("/s1/{}.mp4", i), base + Duration::seconds(i)))
            .await;
        f.store
            .record(entry_at("s2", &format!("/s2/{}.mp4", i), base + Duration::seconds(i)))
            .await;
    }

    let all = f.store.list_all(3).latest();
    assert_eq!(all.len(), 3);

    let s1 = f.store.list_by_server("s1", 2).latest();
    let paths: Vec<_> = s1.iter().map(|e| e.file_path.as_str()).collect();
    assert_eq!(paths, vec!["/s1/3.mp4", "/s1/2.mp4"]);
}

#[tokio::test]
async fn subscribers_see_latest_then_updates() {
    let f = fixture(100);
    f.store.record(entry_at("s1", "/a.mp4", f.clock.now())).await;

    // Attached after the first write
    let mut live = f.store.list_all(10);
    assert_eq!(live.latest().len(), 1);

    f.store
        .record(entry_at("s1", "/b.mp4", f.clock.now() + Duration::seconds(1)))
        .await;
    let next = live.changed().await.expect("store alive");
    assert_eq!(next[0].file_path, "/b.mp4");
    assert_eq!(next.len(), 2);
}

#[tokio::test]
async fn concurrent_records_of_one_file_keep_one_row() {
    let f = fixture(100);
    let mut rx = f.bus.subscribe();
    let now = f.clock.now();
    let play = |position| {
        f.store
            .record(entry_at("s1", "/a.mp4", now).with_progress(position, 60_000))
    };

    // The repository lookup yields, so unserialized writes would interleave
    let (first, second, third, fourth) =
        tokio::join!(play(1_000), play(2_000), play(3_000), play(4_000));
    let first = first.expect("first record");

    for other in [second, third, fourth] {
        assert_eq!(other.expect("merged record").id, first.id);
    }
    let rows = f.repo.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, first.id);
    assert_eq!(rows[0].position_ms, 4_000);

    let inserts = rx
        .drain()
        .into_iter()
        .filter(|e| matches!(e, DomainEvent::HistoryRecorded { merged: false, .. }))
        .count();
    assert_eq!(inserts, 1);
}

#[tokio::test]
async fn server_view_reaches_rows_outside_global_snapshot() {
    tests::init_tracing();
    let repo = Arc::new(MockHistoryRepository::new());
    let clock = Arc::new(ManualClock::at_epoch_offset(0));
    let bus = EventBus::new();
    let config = HistoryConfig {
        max_items: 2,
        list_limit: 2,
        server_list_limit: 2,
    };
    let store = HistoryStore::new(repo.clone(), clock.clone(), config, bus.sender());

    // Rows written before the cap was lowered: s1's only row is the oldest
    let base = clock.now();
    let old = entry_at("s1", "/old.mp4", base);
    repo.insert(&old).await.unwrap();
    for i in 1..=3 {
        repo.insert(&entry_at("s2", &format!("/{}.mp4", i), base + Duration::seconds(i)))
            .await
            .unwrap();
    }
    store.refresh().await.unwrap();
    assert!(store.current().iter().all(|e| e.server_id == "s2"));

    let mut s1 = store.list_by_server("s1", 5);
    let loaded = s1.changed().await.expect("store alive");
    assert_eq!(loaded, vec![old.clone()]);

    // Later writes keep reloading the per-server rows
    let replay = store
        .record(entry_at("s1", "/new.mp4", base + Duration::seconds(10)))
        .await
        .unwrap();
    let paths: Vec<_> = s1.latest().into_iter().map(|e| e.file_path).collect();
    assert_eq!(paths, vec![replay.file_path]);
}
