// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! `IndexHandle`: a per-open-handle view onto one index, carrying the
//! cursor and the transaction-awareness that the read/insert/delete
//! entry points need.

use crate::error::{StoreError, StoreResult};
use crate::key::Key;
use crate::registry::Index;
use crate::transaction::{LockMode, Transaction};
use crate::trie::{BurstTrie, Cursor, Record};
use std::sync::Arc;

/// The lock grant held across one call into [`IndexHandle`].
///
/// Inside a transaction the grant is recorded in the transaction's own
/// lock table and released at commit/abort, so dropping this guard is a
/// no-op (`Held`). Outside a transaction there is nothing else that will
/// ever release it, so the guard itself releases the per-operation grant
/// when it drops at the end of the call (`Owned`).
enum LockGuard {
    Held,
    Owned(Arc<Index>, LockMode),
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let LockGuard::Owned(index, mode) = self {
            match mode {
                LockMode::Read => index.lock.release_read(),
                LockMode::Write => index.lock.release_write(),
            }
        }
    }
}

/// A handle returned by [`crate::registry::IndexRegistry::open`]. Not
/// `Send` across an unguarded clone — each handle owns its own cursor, so
/// concurrent callers each open their own handle onto the same index.
pub struct IndexHandle {
    index: Arc<Index>,
    cursor: Cursor,
    /// The key the cursor currently rests at, used to re-resolve the
    /// cursor after a mutation runs against the same index within the
    /// same transaction (see the module docs on cursor repair).
    last_key: Option<Key>,
    /// Mirrors the per-handle DEAD_LOCK flag: set once this handle has
    /// observed a lock timeout, so it knows its next move must be abort.
    dead_lock: bool,
}

impl IndexHandle {
    pub(crate) fn new(index: Arc<Index>) -> Self {
        IndexHandle {
            index,
            cursor: Cursor::Unset,
            last_key: None,
            dead_lock: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.index.name
    }

    pub fn dead_lock(&self) -> bool {
        self.dead_lock
    }

    /// Reset the cursor to its initial, unpositioned state.
    pub fn reset_cursor(&mut self) {
        self.cursor = Cursor::Unset;
        self.last_key = None;
    }

    fn with_index_err<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        result.map_err(|e| stamp_index(e, &self.index.name))
    }

    /// Acquire a shared (read) grant on this handle's index, either
    /// against `txn`'s lock table (released at commit/abort) or, outside
    /// a transaction, via a guard the caller must hold for the duration
    /// of the operation so it releases the grant once that call returns.
    fn acquire_read(&mut self, txn: Option<&mut Transaction>) -> StoreResult<LockGuard> {
        match txn {
            None => self
                .index
                .lock
                .acquire_read()
                .map(|()| LockGuard::Owned(Arc::clone(&self.index), LockMode::Read))
                .map_err(|e| {
                    self.dead_lock = true;
                    stamp_index(e, &self.index.name)
                }),
            Some(txn) => {
                if txn.lock_mode(&self.index).is_some() {
                    return Ok(LockGuard::Held); // already held, at read or write
                }
                match self.index.lock.acquire_read() {
                    Ok(()) => {
                        txn.record_lock(Arc::clone(&self.index), LockMode::Read);
                        Ok(LockGuard::Held)
                    }
                    Err(e) => {
                        txn.dead_lock = true;
                        self.dead_lock = true;
                        Err(stamp_index(e, &self.index.name))
                    }
                }
            }
        }
    }

    /// Acquire (or upgrade to) an exclusive write grant, per the same
    /// txn/non-txn split as [`Self::acquire_read`].
    fn acquire_write(&mut self, txn: Option<&mut Transaction>) -> StoreResult<LockGuard> {
        match txn {
            None => self
                .index
                .lock
                .acquire_write()
                .map(|()| LockGuard::Owned(Arc::clone(&self.index), LockMode::Write))
                .map_err(|e| {
                    self.dead_lock = true;
                    stamp_index(e, &self.index.name)
                }),
            Some(txn) => match txn.lock_mode(&self.index) {
                Some(LockMode::Write) => Ok(LockGuard::Held),
                Some(LockMode::Read) => match self.index.lock.upgrade() {
                    Ok(()) => {
                        txn.upgrade_lock(&self.index);
                        Ok(LockGuard::Held)
                    }
                    Err(e) => {
                        // Upgrade releases the read grant unconditionally
                        // on entry; on failure this transaction no longer
                        // holds any lock on this index at all.
                        txn.locks.retain(|(i, _)| !Arc::ptr_eq(i, &self.index));
                        txn.dead_lock = true;
                        self.dead_lock = true;
                        Err(stamp_index(e, &self.index.name))
                    }
                },
                None => match self.index.lock.acquire_write() {
                    Ok(()) => {
                        txn.record_lock(Arc::clone(&self.index), LockMode::Write);
                        Ok(LockGuard::Held)
                    }
                    Err(e) => {
                        txn.dead_lock = true;
                        self.dead_lock = true;
                        Err(stamp_index(e, &self.index.name))
                    }
                },
            },
        }
    }

    /// After an insert, re-resolve the cursor against `last_key` so it
    /// survives the structural change the insert may have made (container
    /// burst reassigns `NodeId`s). An insert never removes a payload, so
    /// when the cursor was resting on a record (`Cursor::At`) its record
    /// pointer — the payload sequence number — is re-asserted verbatim;
    /// only the node/key_idx coordinates are refreshed. A cursor that was
    /// already a miss or already at the end is re-resolved as-is.
    fn repair_cursor_after_insert(&mut self, trie: &BurstTrie) {
        let Some(key) = self.last_key.clone() else {
            return;
        };
        match self.cursor {
            Cursor::At { last_seq, .. } => {
                let (_, cursor) = trie.get(&key);
                self.cursor = reassert_seq(cursor, last_seq);
            }
            Cursor::End => {}
            _ => {
                let (_, cursor) = trie.get(&key);
                self.cursor = cursor;
            }
        }
    }

    /// After a delete, re-resolve the cursor against `last_key`.
    ///
    /// A delete can affect the cursor's own key in three ways: it removed
    /// exactly the record the cursor pointed to (jump to `saved_next`, the
    /// pointer resolved just before the delete ran), it removed the whole
    /// key (the record pointer goes null), or it left the pointed-to
    /// record untouched (keep the old pointer). A cursor resting on a
    /// different key, already a miss, or already at the end is simply
    /// re-resolved for node/key_idx drift.
    fn repair_cursor_after_delete(
        &mut self,
        trie: &BurstTrie,
        deleted_key: &Key,
        detached: &[crate::payload::PayloadEntry],
        saved_next: Option<(Key, u64)>,
    ) {
        let Some(key) = self.last_key.clone() else {
            return;
        };
        match self.cursor {
            Cursor::At { last_seq, .. } => {
                if &key == deleted_key && detached.iter().any(|e| e.seq == last_seq) {
                    // The delete removed exactly the record this cursor
                    // pointed to (whole-key delete included: `detached`
                    // then holds every entry, so `last_seq` is among them).
                    match saved_next {
                        Some((next_key, next_seq)) => {
                            let (_, cursor) = trie.get(&next_key);
                            self.cursor = reassert_seq(cursor, next_seq);
                            self.last_key = Some(next_key);
                        }
                        None => {
                            let (_, cursor) = trie.get(&key);
                            self.cursor = cursor;
                        }
                    }
                } else {
                    // Either a different key entirely, or the same key
                    // but this particular record survived — either way
                    // the pointer itself is still valid, only node/key_idx
                    // coordinates need refreshing.
                    let (_, cursor) = trie.get(&key);
                    self.cursor = reassert_seq(cursor, last_seq);
                }
            }
            Cursor::End => {}
            _ => {
                let (_, cursor) = trie.get(&key);
                self.cursor = cursor;
            }
        }
    }

    pub fn get(&mut self, txn: Option<&mut Transaction>, key: &Key) -> StoreResult<Record> {
        debug_assert_eq!(key.kind(), self.index.kind);
        let _guard = self.acquire_read(txn)?;
        let trie = self.index.trie.lock().unwrap();
        let (result, cursor) = trie.get(key);
        self.cursor = cursor;
        self.last_key = Some(key.clone());
        self.with_index_err(result)
    }

    pub fn get_next(&mut self, txn: Option<&mut Transaction>) -> StoreResult<Record> {
        let _guard = self.acquire_read(txn)?;
        let trie = self.index.trie.lock().unwrap();
        let (result, cursor) = trie.get_next(&self.cursor);
        self.cursor = cursor;
        if let Ok(record) = &result {
            self.last_key = Some(record.key.clone());
        }
        self.with_index_err(result)
    }

    pub fn insert(
        &mut self,
        mut txn: Option<&mut Transaction>,
        key: Key,
        payload: Vec<u8>,
    ) -> StoreResult<()> {
        debug_assert_eq!(key.kind(), self.index.kind);
        let _guard = self.acquire_write(txn.as_deref_mut())?;
        {
            let mut trie = self.index.trie.lock().unwrap();
            self.with_index_err(trie.insert(key.clone(), payload.clone()))?;
            if self.last_key.is_some() {
                self.repair_cursor_after_insert(&trie);
            }
        }
        if let Some(txn) = txn {
            txn.log_insert(Arc::clone(&self.index), key, payload);
        }
        Ok(())
    }

    pub fn delete(
        &mut self,
        mut txn: Option<&mut Transaction>,
        key: &Key,
        payload: Option<&[u8]>,
    ) -> StoreResult<()> {
        debug_assert_eq!(key.kind(), self.index.kind);
        let _guard = self.acquire_write(txn.as_deref_mut())?;
        let detached = {
            let mut trie = self.index.trie.lock().unwrap();

            let targets_cursor =
                matches!(self.cursor, Cursor::At { .. }) && self.last_key.as_ref() == Some(key);
            let saved_next = if targets_cursor {
                match trie.get_next(&self.cursor) {
                    (Ok(record), Cursor::At { last_seq, .. }) => Some((record.key, last_seq)),
                    _ => None,
                }
            } else {
                None
            };

            let detached = self.with_index_err(trie.delete(key, payload))?;
            if self.last_key.is_some() {
                self.repair_cursor_after_delete(&trie, key, &detached, saved_next);
            }
            detached
        };
        if let Some(txn) = txn {
            txn.log_delete(Arc::clone(&self.index), key.clone(), detached);
        }
        Ok(())
    }
}

/// Rebuild an `At` cursor's record pointer to `seq` regardless of which
/// entry `trie.get` actually landed the cursor on first; leaves any other
/// cursor variant (a miss, or the end of the index) untouched.
fn reassert_seq(cursor: Cursor, seq: u64) -> Cursor {
    match cursor {
        Cursor::At { node, key_idx, .. } => Cursor::At {
            node,
            key_idx,
            last_seq: seq,
        },
        other => other,
    }
}

fn stamp_index(err: StoreError, name: &str) -> StoreError {
    match err {
        StoreError::KeyNotFound { .. } => StoreError::KeyNotFound { index: name.into() },
        StoreError::EntryExists { .. } => StoreError::EntryExists { index: name.into() },
        StoreError::DbEnd { .. } => StoreError::DbEnd { index: name.into() },
        StoreError::Deadlock { timeout_ms, .. } => StoreError::Deadlock {
            index: name.into(),
            timeout_ms,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use crate::key::{Key, KeyKind};
    use crate::registry::IndexRegistry;

    #[test]
    fn sequential_non_txn_inserts_do_not_deadlock() {
        let registry = IndexRegistry::new();
        registry.create("x", KeyKind::Int64).unwrap();
        let mut handle = registry.open("x").unwrap();

        handle.insert(None, Key::Int64(1), b"a".to_vec()).unwrap();
        handle.insert(None, Key::Int64(2), b"b".to_vec()).unwrap();
        assert!(!handle.dead_lock());
    }

    #[test]
    fn cursor_repair_after_insert_preserves_mid_scan_position() {
        let registry = IndexRegistry::new();
        registry.create("x", KeyKind::Int64).unwrap();
        let mut handle = registry.open("x").unwrap();

        handle.insert(None, Key::Int64(1), b"a".to_vec()).unwrap();
        handle.insert(None, Key::Int64(1), b"b".to_vec()).unwrap();
        handle.insert(None, Key::Int64(1), b"c".to_vec()).unwrap();

        assert_eq!(handle.get(None, &Key::Int64(1)).unwrap().payload, b"a");
        assert_eq!(handle.get_next(None).unwrap().payload, b"b");

        // An unrelated insert re-resolves node coordinates but must not
        // reset the record pointer back to this key's first payload.
        handle.insert(None, Key::Int64(2), b"z".to_vec()).unwrap();

        assert_eq!(handle.get_next(None).unwrap().payload, b"c");
    }

    #[test]
    fn cursor_repair_after_delete_of_pointed_record_jumps_to_saved_next() {
        let registry = IndexRegistry::new();
        registry.create("x", KeyKind::Int64).unwrap();
        let mut handle = registry.open("x").unwrap();

        handle.insert(None, Key::Int64(1), b"a".to_vec()).unwrap();
        handle.insert(None, Key::Int64(1), b"b".to_vec()).unwrap();
        handle.insert(None, Key::Int64(1), b"c".to_vec()).unwrap();

        assert_eq!(handle.get(None, &Key::Int64(1)).unwrap().payload, b"a");

        // Deletes exactly the record the cursor is resting on.
        handle
            .delete(None, &Key::Int64(1), Some(b"a"))
            .unwrap();

        // The cursor should have jumped to "b" (the pointer saved before
        // the delete ran), so the next call yields "c", not "b" again.
        assert_eq!(handle.get_next(None).unwrap().payload, b"c");
    }

    #[test]
    fn cursor_repair_after_delete_of_different_key_keeps_pointer() {
        let registry = IndexRegistry::new();
        registry.create("x", KeyKind::Int64).unwrap();
        let mut handle = registry.open("x").unwrap();

        handle.insert(None, Key::Int64(1), b"a".to_vec()).unwrap();
        handle.insert(None, Key::Int64(1), b"b".to_vec()).unwrap();
        handle.insert(None, Key::Int64(2), b"z".to_vec()).unwrap();

        assert_eq!(handle.get(None, &Key::Int64(1)).unwrap().payload, b"a");
        assert_eq!(handle.get_next(None).unwrap().payload, b"b");

        // A delete on an unrelated key must not disturb this cursor.
        handle.delete(None, &Key::Int64(2), None).unwrap();

        let err = handle.get_next(None).unwrap_err();
        assert!(matches!(err, crate::error::StoreError::DbEnd { .. }));
    }
}
