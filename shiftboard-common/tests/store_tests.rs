//! Integration tests for the schedule store
//!
//! Covers:
//! - Missing and corrupt files read as empty documents
//! - Merge replaces per (day, shift) and leaves other entries untouched
//! - Round trip of canonical documents
//! - Legacy files normalized on read and rewritten by migrate
//! - Store directories never collide
//! - Backup of the previous file before overwrite
//! - Concurrent writers and readers on the same month

use serde_json::json;
use shiftboard_common::fs_utils::{read_json, JsonFile};
use shiftboard_common::store::{SaveOutcome, ScheduleStore, StoreOptions};
use shiftboard_common::{Period, ScheduleDocument, ScheduleUpdate, ShiftKind, SlotPair, StoreId};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tempfile::TempDir;

fn setup() -> (TempDir, ScheduleStore) {
    let dir = TempDir::new().unwrap();
    let store = ScheduleStore::new(dir.path(), StoreOptions::default());
    (dir, store)
}

fn wakaba() -> StoreId {
    StoreId::new("wakaba-2").unwrap()
}

fn april() -> Period {
    Period::new(2025, 4).unwrap()
}

fn update_from(value: serde_json::Value) -> ScheduleUpdate {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_end_to_end_two_saves() {
    let (_dir, store) = setup();
    let id = wakaba();

    assert!(store.read(&id, april()).is_empty());

    store
        .merge_and_write(&id, april(), &update_from(json!({"1": {"early": ["Sato", ""]}})))
        .unwrap();
    assert_eq!(
        serde_json::to_value(store.read(&id, april())).unwrap(),
        json!({"1": {"early": ["Sato", ""]}})
    );

    store
        .merge_and_write(&id, april(), &update_from(json!({"2": {"night": ["Ito", "Kato"]}})))
        .unwrap();
    assert_eq!(
        serde_json::to_value(store.read(&id, april())).unwrap(),
        json!({
            "1": {"early": ["Sato", ""]},
            "2": {"night": ["Ito", "Kato"]}
        })
    );
}

#[test]
fn test_merge_leaves_other_days_byte_identical() {
    let (_dir, store) = setup();
    let id = wakaba();

    store
        .merge_and_write(
            &id,
            april(),
            &update_from(json!({
                "3": {"morning": ["A", "B"]},
                "4": {"evening": ["Mori", ""], "night": ["", "Ueda"]}
            })),
        )
        .unwrap();
    let before = store.read(&id, april()).day(4).cloned();

    store
        .merge_and_write(&id, april(), &update_from(json!({"3": {"morning": ["C", ""]}})))
        .unwrap();
    let after = store.read(&id, april());

    assert_eq!(after.day(4).cloned(), before);
    assert_eq!(after.slot(3, ShiftKind::Morning), Some(&SlotPair::new("C", "")));
}

#[test]
fn test_merge_replaces_entry_not_pair_elements() {
    let (_dir, store) = setup();
    let id = wakaba();

    store
        .merge_and_write(&id, april(), &update_from(json!({"5": {"early": ["A", "B"]}})))
        .unwrap();
    store
        .merge_and_write(&id, april(), &update_from(json!({"5": {"early": ["", ""]}})))
        .unwrap();

    assert_eq!(
        store.read(&id, april()).slot(5, ShiftKind::Early),
        Some(&SlotPair::new("", ""))
    );
}

#[test]
fn test_round_trip_canonical_document() {
    let (_dir, store) = setup();
    let id = wakaba();
    let doc: ScheduleDocument = serde_json::from_value(json!({
        "1": {"early": ["Sato", ""], "afternoon": ["Ito", "Kato"]},
        "15": {"night": ["", "Mori"]},
        "30": {"morning": ["Ueda", "Sato"], "evening": ["", ""]}
    }))
    .unwrap();

    store.merge_and_write(&id, april(), &doc).unwrap();

    assert_eq!(store.read(&id, april()), doc);
}

#[test]
fn test_legacy_wrapped_file_is_normalized_and_migrated() {
    let (_dir, store) = setup();
    let id = wakaba();
    let path = store.schedule_path(&id, april());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"{"d": {"5": {"午前": ["X", "Y"], "unknown": "Z"}, "40": {"early": "Q"}}}"#,
    )
    .unwrap();

    let expected = json!({"5": {"morning": ["X", "Y"]}});
    assert_eq!(serde_json::to_value(store.read(&id, april())).unwrap(), expected);

    let outcome = store.migrate(&id, april()).unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { updated_entries: 0, total_days: 1, .. }));
    assert_eq!(store.read_raw(&id, april()), expected);
}

#[test]
fn test_corrupt_file_reads_empty_and_is_replaced_on_save() {
    let (_dir, store) = setup();
    let id = wakaba();
    let path = store.schedule_path(&id, april());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{\"1\": {\"early\": [").unwrap();

    assert!(store.read(&id, april()).is_empty());

    store
        .merge_and_write(&id, april(), &update_from(json!({"2": {"night": ["Ito", ""]}})))
        .unwrap();
    assert_eq!(
        serde_json::to_value(store.read(&id, april())).unwrap(),
        json!({"2": {"night": ["Ito", ""]}})
    );
}

#[test]
fn test_backup_holds_previous_contents() {
    let (_dir, store) = setup();
    let id = wakaba();

    let first = store
        .merge_and_write(&id, april(), &update_from(json!({"1": {"early": ["A", ""]}})))
        .unwrap();
    assert!(matches!(first, SaveOutcome::Saved { backup: None, .. }));
    let previous = fs::read_to_string(store.schedule_path(&id, april())).unwrap();

    let second = store
        .merge_and_write(&id, april(), &update_from(json!({"1": {"early": ["B", ""]}})))
        .unwrap();
    let SaveOutcome::Saved { backup: Some(backup), .. } = second else {
        panic!("expected a backup on second save, got {:?}", second);
    };

    assert_eq!(fs::read_to_string(backup).unwrap(), previous);
}

#[test]
fn test_distinct_stores_do_not_share_files() {
    let (_dir, store) = setup();
    let plain = StoreId::new("a_b").unwrap();
    let tricky = StoreId::new("a/b").unwrap();

    assert_ne!(store.schedule_path(&plain, april()), store.schedule_path(&tricky, april()));

    store
        .merge_and_write(&plain, april(), &update_from(json!({"1": {"early": ["Plain", ""]}})))
        .unwrap();
    store
        .merge_and_write(&tricky, april(), &update_from(json!({"1": {"early": ["Tricky", ""]}})))
        .unwrap();

    assert_eq!(
        store.read(&plain, april()).slot(1, ShiftKind::Early),
        Some(&SlotPair::new("Plain", ""))
    );
    assert_eq!(
        store.read(&tricky, april()).slot(1, ShiftKind::Early),
        Some(&SlotPair::new("Tricky", ""))
    );
}

#[test]
fn test_months_are_independent() {
    let (_dir, store) = setup();
    let id = wakaba();

    store
        .merge_and_write(&id, april(), &update_from(json!({"1": {"early": ["A", ""]}})))
        .unwrap();

    assert!(store.read(&id, april().next()).is_empty());
    assert!(store.read(&id, april().prev()).is_empty());
}

#[test]
fn test_write_failure_is_reported() {
    let (dir, store) = setup();
    let id = wakaba();
    // A regular file where the store directory should be
    fs::write(dir.path().join(id.dir_name()), "not a directory").unwrap();

    let result =
        store.merge_and_write(&id, april(), &update_from(json!({"1": {"early": ["A", ""]}})));

    assert!(result.is_err());
}

#[test]
fn test_concurrent_writers_never_fail_or_truncate() {
    let (_dir, store) = setup();
    let id = wakaba();
    let path = store.schedule_path(&id, april());
    let done = AtomicBool::new(false);

    let corrupt_reads = thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut corrupt = 0;
            while !done.load(Ordering::Acquire) {
                if let JsonFile::Corrupt(_) = read_json(&path) {
                    corrupt += 1;
                }
            }
            corrupt
        });

        let writers: Vec<_> = (1..=8u32)
            .map(|day| {
                let store = &store;
                let id = &id;
                scope.spawn(move || {
                    for round in 0..50 {
                        let update = update_from(json!({
                            (day.to_string()): {"early": [format!("W{}", round), ""]}
                        }));
                        store.merge_and_write(id, april(), &update).unwrap();
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap()
    });

    assert_eq!(corrupt_reads, 0);
    assert!(matches!(read_json(&path), JsonFile::Loaded(_)));
    assert!(!store.read(&id, april()).is_empty());

    let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
