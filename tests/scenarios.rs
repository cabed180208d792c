// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios exercising the burst trie engine and the
//! transaction/locking layer together through `IndexRegistry`.

use burstdb::{IndexRegistry, Key, KeyKind, Transaction};

fn drain(registry: &IndexRegistry, name: &str) -> Vec<(Key, Vec<u8>)> {
    let mut handle = registry.open(name).unwrap();
    let mut out = Vec::new();
    loop {
        match handle.get_next(None) {
            Ok(record) => out.push((record.key, record.payload)),
            Err(_) => break,
        }
    }
    out
}

/// S1 — ordering over negatives.
#[test]
fn s1_ordering_over_negatives() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::Int64).unwrap();
    let mut handle = registry.open("x").unwrap();

    for k in [-5i64, 100, 0, i64::MIN, i64::MAX] {
        handle.insert(None, Key::Int64(k), b"p".to_vec()).unwrap();
    }

    let keys: Vec<i64> = drain(&registry, "x")
        .into_iter()
        .map(|(k, _)| match k {
            Key::Int64(v) => v,
            _ => unreachable!(),
        })
        .collect();

    assert_eq!(keys, vec![i64::MIN, -5, 0, 100, i64::MAX]);
}

/// S2 — duplicate-payload rejection.
#[test]
fn s2_duplicate_payload_rejection() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::Int64).unwrap();
    let mut handle = registry.open("x").unwrap();

    handle
        .insert(None, Key::Int64(42), b"abc".to_vec())
        .unwrap();
    let err = handle
        .insert(None, Key::Int64(42), b"abc".to_vec())
        .unwrap_err();
    assert!(matches!(err, burstdb::StoreError::EntryExists { .. }));

    handle
        .insert(None, Key::Int64(42), b"abd".to_vec())
        .unwrap();

    let first = handle.get(None, &Key::Int64(42)).unwrap();
    assert_eq!(first.payload, b"abc");
    let second = handle.get_next(None).unwrap();
    assert_eq!(second.payload, b"abd");
}

/// S3 — abort replay.
#[test]
fn s3_abort_replay() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::Int64).unwrap();
    let mut handle = registry.open("x").unwrap();

    let mut txn = Transaction::begin();
    handle
        .insert(Some(&mut txn), Key::Int64(7), b"a".to_vec())
        .unwrap();
    handle.delete(Some(&mut txn), &Key::Int64(7), None).unwrap();
    handle
        .insert(Some(&mut txn), Key::Int64(7), b"b".to_vec())
        .unwrap();
    txn.abort().unwrap();

    let err = handle.get(None, &Key::Int64(7)).unwrap_err();
    assert!(matches!(err, burstdb::StoreError::KeyNotFound { .. }));
}

/// S4 — VarBytes burst.
#[test]
fn s4_varbytes_burst() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::VarBytes).unwrap();
    let mut handle = registry.open("x").unwrap();

    let suffixes = "abcdefghijklm".chars().collect::<Vec<_>>();
    let mut inserted = Vec::new();
    for &c in &suffixes {
        let key = Key::var_bytes(format!("A{c}").into_bytes()).unwrap();
        handle.insert(None, key.clone(), b"p".to_vec()).unwrap();
        inserted.push(format!("A{c}"));
    }
    assert_eq!(inserted.len(), 13);

    let scanned: Vec<String> = drain(&registry, "x")
        .into_iter()
        .map(|(k, _)| match k {
            Key::VarBytes(bytes) => String::from_utf8(bytes).unwrap(),
            _ => unreachable!(),
        })
        .collect();

    let mut expected = inserted.clone();
    expected.sort();
    assert_eq!(scanned, expected);
}

/// S5 — cursor across in-txn mutations.
#[test]
fn s5_cursor_across_in_txn_mutations() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::Int64).unwrap();
    let mut handle = registry.open("x").unwrap();

    for k in 1..=5i64 {
        handle.insert(None, Key::Int64(k), b"p".to_vec()).unwrap();
    }

    let mut txn = Transaction::begin();
    let got = handle.get(Some(&mut txn), &Key::Int64(2)).unwrap();
    assert_eq!(got.payload, b"p");

    handle
        .delete(Some(&mut txn), &Key::Int64(4), Some(b"p"))
        .unwrap();

    let next = handle.get_next(Some(&mut txn)).unwrap();
    assert!(matches!(next.key, Key::Int64(3)));

    let next = handle.get_next(Some(&mut txn)).unwrap();
    assert!(matches!(next.key, Key::Int64(5)));

    let end = handle.get_next(Some(&mut txn));
    assert!(matches!(end, Err(burstdb::StoreError::DbEnd { .. })));

    txn.commit();
}

/// S6 — deadlock surface: a held exclusive lock forces a contending
/// handle to observe `Deadlock` within the lock's deadline.
#[test]
fn s6_deadlock_surface() {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    let registry = Arc::new(IndexRegistry::new());
    registry.create("x", KeyKind::Int64).unwrap();

    let mut t1 = Transaction::begin();
    let mut h1 = registry.open("x").unwrap();
    h1.insert(Some(&mut t1), Key::Int64(1), b"p".to_vec())
        .unwrap();

    let registry2 = Arc::clone(&registry);
    let worker = thread::spawn(move || {
        let mut t2 = Transaction::begin();
        let mut h2 = registry2.open("x").unwrap();
        let result = h2.get(Some(&mut t2), &Key::Int64(1));
        (result, h2.dead_lock(), t2)
    });

    thread::sleep(Duration::from_millis(200));
    t1.commit();

    let (result, dead_lock, t2) = worker.join().unwrap();
    assert!(matches!(result, Err(burstdb::StoreError::Deadlock { .. })));
    assert!(dead_lock);
    // T2 must not release a lock it never acquired.
    let _ = t2.abort();
}

/// Invariant: a fresh index's first `get_next` reports `DbEnd`.
#[test]
fn empty_index_get_next_is_db_end() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::Int64).unwrap();
    let mut handle = registry.open("x").unwrap();
    let err = handle.get_next(None).unwrap_err();
    assert!(matches!(err, burstdb::StoreError::DbEnd { .. }));
}

/// Invariant: insert-then-delete of the same (key, payload) restores the
/// index to its prior enumeration.
#[test]
fn insert_delete_round_trip_is_transparent() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::Int64).unwrap();
    let mut handle = registry.open("x").unwrap();

    for k in 1..=20i64 {
        handle.insert(None, Key::Int64(k), b"p".to_vec()).unwrap();
    }
    let before = drain(&registry, "x");

    handle
        .insert(None, Key::Int64(999), b"extra".to_vec())
        .unwrap();
    handle
        .delete(None, &Key::Int64(999), Some(b"extra"))
        .unwrap();
    let after = drain(&registry, "x");

    assert_eq!(before, after);
}

/// Boundary: a VarBytes container bursts at its configured capacity and
/// still accepts the next insert without error.
#[test]
fn container_burst_accepts_overflow_insert() {
    let registry = IndexRegistry::new();
    registry.create("x", KeyKind::VarBytes).unwrap();
    let mut handle = registry.open("x").unwrap();

    for i in 0..20u8 {
        let key = Key::var_bytes(vec![b'B', 65 + i]).unwrap();
        handle.insert(None, key, b"p".to_vec()).unwrap();
    }

    let scanned = drain(&registry, "x");
    assert_eq!(scanned.len(), 20);
}
