//! Scheduler Tests
//!
//! These tests verify:
//! - A change notification saves at once when the last save is old enough
//! - A burst inside the debounce window costs a single save
//! - The periodic tick saves a dirty store and skips a clean one
//! - Stopping performs a final synchronous save
//! - The scheduler exits on its own once the store is gone

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chestkv::durability::Scheduler;
use chestkv::store::Store;
use chestkv::{LogAndContinue, Value};
use crossbeam::channel;
use tempfile::TempDir;

const LONG: Duration = Duration::from_secs(30);

// =============================================================================
// Helper Functions
// =============================================================================

fn setup(debounce: Duration, interval: Duration) -> (TempDir, Arc<Store>, Scheduler) {
    let temp_dir = TempDir::new().unwrap();
    let (tx, rx) = channel::bounded(1);
    let store = Arc::new(Store::open(temp_dir.path().join("chest.snapshot"), tx).unwrap());
    store.set_error_handler(LogAndContinue);
    let scheduler = Scheduler::spawn(Arc::downgrade(&store), rx, debounce, interval).unwrap();
    (temp_dir, store, scheduler)
}

/// Poll `cond` until it holds or `timeout` expires
fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

fn reload(path: &Path) -> Store {
    let (tx, _rx) = channel::bounded(1);
    Store::open(path, tx).unwrap()
}

// =============================================================================
// Notification Path
// =============================================================================

#[test]
fn test_first_change_saves_immediately() {
    let (_temp, store, scheduler) = setup(LONG, LONG);

    store.set("k", 1).unwrap();

    assert!(wait_until(Duration::from_secs(5), || store.save_count() == 1));
    assert!(store.last_save().is_some());
    scheduler.stop().unwrap();
}

#[test]
fn test_burst_within_window_saves_once() {
    let (_temp, store, scheduler) = setup(LONG, LONG);

    for i in 0..200 {
        store.set(format!("key{}", i), i).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || store.save_count() >= 1));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(store.save_count(), 1);

    scheduler.stop().unwrap();
}

#[test]
fn test_change_after_window_saves_again() {
    let debounce = Duration::from_millis(100);
    let (_temp, store, scheduler) = setup(debounce, LONG);

    store.set("k", 1).unwrap();
    assert!(wait_until(Duration::from_secs(5), || store.save_count() == 1));

    thread::sleep(debounce * 2);
    store.set("k", 2).unwrap();
    assert!(wait_until(Duration::from_secs(5), || store.save_count() == 2));
    assert!(!store.is_dirty());

    scheduler.stop().unwrap();
}

// =============================================================================
// Periodic Tick
// =============================================================================

#[test]
fn test_tick_saves_dirty_store() {
    let (_temp, store, scheduler) = setup(LONG, Duration::from_millis(50));

    store.set("k", 1).unwrap();
    assert!(wait_until(Duration::from_secs(5), || store.save_count() >= 1));

    // Inside the debounce window: only the tick can pick this up
    store.set("k", 2).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        !store.is_dirty() && store.save_count() >= 2
    }));

    scheduler.stop().unwrap();
}

#[test]
fn test_tick_skips_clean_store() {
    let (_temp, store, scheduler) = setup(LONG, Duration::from_millis(20));

    thread::sleep(Duration::from_millis(200));
    assert_eq!(store.save_count(), 0);

    scheduler.stop().unwrap();
}

// =============================================================================
// Shutdown
// =============================================================================

#[test]
fn test_stop_performs_final_save() {
    let (_temp, store, scheduler) = setup(LONG, LONG);

    // Start a debounce window so the next notification is ignored
    store.save().unwrap();
    store.set("late", "write").unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(store.is_dirty());

    scheduler.stop().unwrap();

    assert!(!store.is_dirty());
    assert_eq!(store.save_count(), 2);
    assert_eq!(
        reload(store.snapshot_path()).get("late").unwrap(),
        Value::from("write")
    );
}

#[test]
fn test_scheduler_exits_when_store_dropped() {
    let (_temp, store, scheduler) = setup(LONG, LONG);

    drop(store);

    // Returns promptly: the thread noticed the store went away
    scheduler.stop().unwrap();
}
