use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use study_hub::StatusTicker;
use study_hub::schedule::Timetable;
use tokio::time::timeout;

fn sunday_at(h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 5)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

#[test]
fn initial_snapshot_is_available_without_a_runtime() {
    let ticker = StatusTicker::new(Timetable::default(), sunday_at(11, 15));
    let snapshot = ticker.latest();
    assert_eq!(snapshot.status.kind(), "active");
    assert_eq!(snapshot.computed_at, sunday_at(11, 15));
    assert!(!ticker.is_running());

    let refreshed = ticker.refresh(sunday_at(18, 0));
    assert_eq!(refreshed.status.kind(), "free");
    assert_eq!(ticker.latest(), refreshed);
}

#[tokio::test]
async fn ticker_publishes_recomputed_snapshots() {
    let mut ticker = StatusTicker::new(Timetable::default(), sunday_at(6, 0));
    let mut updates = ticker.subscribe();
    ticker.start_with_clock(Duration::from_millis(10), || sunday_at(10, 0));
    assert!(ticker.is_running());

    timeout(Duration::from_secs(2), updates.changed())
        .await
        .expect("ticker published in time")
        .unwrap();
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.status.kind(), "upcoming");
    assert_eq!(snapshot.next_class.unwrap().code, "GED 1117");

    assert!(ticker.stop());
    assert!(!ticker.is_running());
    assert!(!ticker.stop());
}

#[tokio::test]
async fn restarting_replaces_the_running_task() {
    let first_calls = Arc::new(AtomicU32::new(0));
    let second_calls = Arc::new(AtomicU32::new(0));

    let mut ticker = StatusTicker::new(Timetable::default(), sunday_at(6, 0));
    let counter = Arc::clone(&first_calls);
    ticker.start_with_clock(Duration::from_millis(5), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        sunday_at(10, 0)
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let counter = Arc::clone(&second_calls);
    ticker.start_with_clock(Duration::from_millis(5), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        sunday_at(18, 0)
    });
    // let an aborted task observe cancellation before sampling
    tokio::time::sleep(Duration::from_millis(10)).await;
    let frozen = first_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert!(frozen > 0);
    assert_eq!(first_calls.load(Ordering::SeqCst), frozen);
    assert!(second_calls.load(Ordering::SeqCst) > 0);
    assert_eq!(ticker.latest().status.kind(), "free");
}
