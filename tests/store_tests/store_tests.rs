//! Store Tests
//!
//! These tests verify:
//! - Operation semantics (set/get/append/set_add/set_exists)
//! - Type stability of sequences and sets
//! - Failed operations leave state untouched
//! - Dirty flag and non-blocking change notifications
//! - A closed store refuses mutations
//! - Concurrent access never exposes torn values

use std::sync::Arc;
use std::thread;

use chestkv::store::Store;
use chestkv::{ChestError, ElemTag, Scalar, Shape, ShapeError, Value};
use crossbeam::channel::{self, Receiver};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store, Receiver<()>) {
    let temp_dir = TempDir::new().unwrap();
    let (tx, rx) = channel::bounded(1);
    let store = Store::open(temp_dir.path().join("chest.snapshot"), tx).unwrap();
    (temp_dir, store, rx)
}

fn ints(values: &[i64]) -> Vec<Scalar> {
    values.iter().map(|&v| Scalar::Int(v)).collect()
}

// =============================================================================
// Set / Get
// =============================================================================

#[test]
fn test_set_get() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set("foo", "foo").unwrap();
    assert_eq!(store.get("foo").unwrap(), Value::from("foo"));
}

#[test]
fn test_get_missing_key() {
    let (_temp, store, _rx) = setup_temp_store();

    let err = store.get("missing").unwrap_err();
    assert!(matches!(err, ChestError::KeyNotFound(ref k) if k == "missing"));
}

#[test]
fn test_set_overwrites_any_shape() {
    let (_temp, store, _rx) = setup_temp_store();

    store.append("k", [1, 2, 3]).unwrap();
    store.set("k", "now a string").unwrap();
    assert_eq!(store.get("k").unwrap(), Value::from("now a string"));

    let set = Value::set(ElemTag::Int, ints(&[4])).unwrap();
    store.set("k", set.clone()).unwrap();
    assert_eq!(store.get("k").unwrap(), set);
}

#[test]
fn test_set_rejects_ill_formed_value() {
    let (_temp, store, _rx) = setup_temp_store();
    store.set("k", 1).unwrap();

    let bad = Value::Sequence {
        elem: ElemTag::Int,
        items: vec![Scalar::Int(1), Scalar::Str("x".into())],
    };
    let err = store.set("k", bad).unwrap_err();
    assert!(matches!(err, ChestError::TypeMismatch { .. }));
    assert_eq!(store.get("k").unwrap(), Value::from(1));
}

// =============================================================================
// Append
// =============================================================================

#[test]
fn test_append_creates_then_extends() {
    let (_temp, store, _rx) = setup_temp_store();

    assert_eq!(store.append("foo", [1, 2, 3]).unwrap(), 3);
    assert_eq!(store.append("foo", [4, 5]).unwrap(), 5);

    let value = store.get("foo").unwrap();
    assert_eq!(value.elem_tag(), Some(ElemTag::Int));
    assert_eq!(value.as_sequence().unwrap(), ints(&[1, 2, 3, 4, 5]).as_slice());
}

#[test]
fn test_append_incompatible_type_leaves_sequence() {
    let (_temp, store, _rx) = setup_temp_store();

    store.append("l", [1, 2, 3]).unwrap();
    let err = store.append("l", ["x"]).unwrap_err();

    match err {
        ChestError::TypeMismatch { key, source } => {
            assert_eq!(key, "l");
            assert_eq!(
                source,
                ShapeError::ElementType {
                    expected: ElemTag::Int,
                    found: ElemTag::Str
                }
            );
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    assert_eq!(store.get("l").unwrap().as_sequence().unwrap(), ints(&[1, 2, 3]).as_slice());
}

#[test]
fn test_append_mixed_batch_applies_nothing() {
    let (_temp, store, _rx) = setup_temp_store();

    store.append("l", [1]).unwrap();
    let batch = vec![Scalar::Int(2), Scalar::Str("x".into()), Scalar::Int(3)];
    assert!(matches!(
        store.append("l", batch),
        Err(ChestError::TypeMismatch { .. })
    ));
    assert_eq!(store.get("l").unwrap().as_sequence().unwrap(), ints(&[1]).as_slice());

    // A mixed batch on an absent key creates nothing either
    let batch = vec![Scalar::Int(2), Scalar::Bool(true)];
    assert!(store.append("fresh", batch).is_err());
    assert!(matches!(store.get("fresh"), Err(ChestError::KeyNotFound(_))));
}

#[test]
fn test_append_to_scalar_or_set_fails() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set("s", "scalar").unwrap();
    store.set_add("members", 1).unwrap();

    let err = store.append("s", [1]).unwrap_err();
    assert!(matches!(
        err,
        ChestError::TypeMismatch {
            source: ShapeError::Shape {
                expected: Shape::Sequence,
                found: Shape::Scalar
            },
            ..
        }
    ));
    assert!(matches!(
        store.append("members", [1]),
        Err(ChestError::TypeMismatch { .. })
    ));
    assert_eq!(store.get("s").unwrap(), Value::from("scalar"));
}

#[test]
fn test_append_empty_is_invalid() {
    let (_temp, store, _rx) = setup_temp_store();

    let err = store.append("l", Vec::<Scalar>::new()).unwrap_err();
    assert!(matches!(err, ChestError::InvalidArgument(_)));
    assert!(store.is_empty());
    assert!(!store.is_dirty());
}

// =============================================================================
// Sets
// =============================================================================

#[test]
fn test_set_add_and_exists() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set_add("bar", 1).unwrap();
    store.set_add("bar", 42).unwrap();

    assert!(store.set_exists("bar", 1).is_ok());
    assert!(store.set_exists("bar", 42).is_ok());
    assert!(matches!(
        store.set_exists("bar", 99),
        Err(ChestError::MemberNotFound { ref key }) if key == "bar"
    ));
}

#[test]
fn test_set_exists_missing_key() {
    let (_temp, store, _rx) = setup_temp_store();

    assert!(matches!(
        store.set_exists("nope", 1),
        Err(ChestError::KeyNotFound(_))
    ));
}

#[test]
fn test_set_add_is_idempotent() {
    let (_temp, store, _rx) = setup_temp_store();

    assert!(store.set_add("s", 5).unwrap());
    assert!(!store.set_add("s", 5).unwrap());

    assert!(store.set_exists("s", 5).is_ok());
    assert_eq!(store.get("s").unwrap().as_set().unwrap().len(), 1);
}

#[test]
fn test_set_add_incompatible_type_fails() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set_add("s", 5).unwrap();
    assert!(matches!(
        store.set_add("s", "five"),
        Err(ChestError::TypeMismatch { .. })
    ));
    assert_eq!(store.get("s").unwrap().as_set().unwrap().len(), 1);

    store.append("l", [1]).unwrap();
    assert!(matches!(
        store.set_add("l", 1),
        Err(ChestError::TypeMismatch { .. })
    ));
}

#[test]
fn test_set_exists_on_non_set_fails() {
    let (_temp, store, _rx) = setup_temp_store();

    store.append("l", [1]).unwrap();
    assert!(matches!(
        store.set_exists("l", 1),
        Err(ChestError::TypeMismatch { .. })
    ));
}

#[test]
fn test_set_exists_with_other_type_is_not_member() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set_add("s", 1).unwrap();
    assert!(matches!(
        store.set_exists("s", "1"),
        Err(ChestError::MemberNotFound { .. })
    ));
}

// =============================================================================
// Dirty Flag / Notifications
// =============================================================================

#[test]
fn test_fresh_store_is_clean() {
    let (_temp, store, rx) = setup_temp_store();

    assert!(!store.is_dirty());
    assert!(store.last_save().is_none());
    assert_eq!(store.save_count(), 0);
    assert!(rx.is_empty());
}

#[test]
fn test_mutations_mark_dirty_reads_do_not() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set("k", 1).unwrap();
    assert!(store.is_dirty());

    store.save().unwrap();
    assert!(!store.is_dirty());

    store.get("k").unwrap();
    let _ = store.set_exists("k", 1);
    assert!(!store.is_dirty());
}

#[test]
fn test_failed_mutation_does_not_mark_dirty() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set("k", 1).unwrap();
    store.save().unwrap();

    assert!(store.append("k", [1]).is_err());
    assert!(!store.is_dirty());
}

#[test]
fn test_readding_member_does_not_mark_dirty() {
    let (_temp, store, _rx) = setup_temp_store();

    store.set_add("s", 1).unwrap();
    store.save().unwrap();

    store.set_add("s", 1).unwrap();
    assert!(!store.is_dirty());
}

#[test]
fn test_notifications_never_block_and_coalesce() {
    let (_temp, store, rx) = setup_temp_store();

    // Nobody drains the channel; a blocking send would hang here
    for i in 0..1000 {
        store.set(format!("key{}", i), i).unwrap();
    }

    assert_eq!(rx.len(), 1);
    assert_eq!(store.len(), 1000);
}

#[test]
fn test_notifications_without_scheduler() {
    let temp_dir = TempDir::new().unwrap();
    let (tx, rx) = channel::bounded(1);
    drop(rx);

    let store = Store::open(temp_dir.path().join("chest.snapshot"), tx).unwrap();
    store.set("k", 1).unwrap();
    assert_eq!(store.get("k").unwrap(), Value::from(1));
}

#[test]
fn test_closed_store_rejects_mutations() {
    let (_temp, store, rx) = setup_temp_store();
    store.set("k", 1).unwrap();
    store.save().unwrap();
    let _ = rx.try_recv();

    store.close();
    assert!(store.is_closed());

    assert!(matches!(store.set("k", 2), Err(ChestError::Closed)));
    assert!(matches!(store.append("l", [1]), Err(ChestError::Closed)));
    assert!(matches!(store.set_add("s", 1), Err(ChestError::Closed)));

    // Reads keep working and nothing is left to save
    assert_eq!(store.get("k").unwrap(), Value::from(1));
    assert!(!store.is_dirty());
    assert!(rx.try_recv().is_err());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_set_get_no_torn_values() {
    let (_temp, store, _rx) = setup_temp_store();
    let store = Arc::new(store);

    let writers = 8;
    let rounds = 500;

    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let payload = vec![Scalar::Int(w); 16];
                let value = Value::sequence(ElemTag::Int, payload).unwrap();
                for _ in 0..rounds {
                    store.set("shared", value.clone()).unwrap();
                    let seen = store.get("shared").unwrap();
                    let items = seen.as_sequence().unwrap();
                    // Every observed value was written whole by one writer
                    assert_eq!(items.len(), 16);
                    assert!(items.iter().all(|i| i == &items[0]));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_appends_all_land() {
    let (_temp, store, _rx) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    store.append("log", [t * 1000 + i]).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get("log").unwrap().as_sequence().unwrap().len(), 1000);
}
