// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Transactions: a log of operations plus the locks they acquired,
//! released together on commit and inverted together on abort.
//!
//! This crate models a transaction as a single owning object rather than
//! the source's mutual handle↔transaction linked-list registration: every
//! [`IndexHandle`](crate::handle::IndexHandle) operation that runs under a
//! transaction appends directly to that transaction's own log and lock
//! table, so there is nothing to walk back through at commit/abort time
//! except the `Transaction` itself.

use crate::error::{StoreError, StoreResult};
use crate::key::Key;
use crate::payload::PayloadEntry;
use crate::registry::Index;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    Read,
    Write,
}

pub(crate) enum LogEntry {
    Insert {
        index: Arc<Index>,
        key: Key,
        payload: Vec<u8>,
    },
    Delete {
        index: Arc<Index>,
        key: Key,
        detached: Vec<PayloadEntry>,
    },
}

/// A live transaction: an operation log and the set of index locks it
/// currently holds.
pub struct Transaction {
    id: Uuid,
    pub(crate) locks: Vec<(Arc<Index>, LockMode)>,
    log: Vec<LogEntry>,
    /// Set once a lock acquisition times out. Abort must not try to
    /// release locks this transaction never actually holds.
    pub(crate) dead_lock: bool,
}

impl Transaction {
    pub fn begin() -> Self {
        Transaction {
            id: Uuid::new_v4(),
            locks: Vec::new(),
            log: Vec::new(),
            dead_lock: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn lock_mode(&self, index: &Arc<Index>) -> Option<LockMode> {
        self.locks
            .iter()
            .find(|(i, _)| Arc::ptr_eq(i, index))
            .map(|(_, mode)| *mode)
    }

    pub(crate) fn record_lock(&mut self, index: Arc<Index>, mode: LockMode) {
        self.locks.push((index, mode));
    }

    pub(crate) fn upgrade_lock(&mut self, index: &Arc<Index>) {
        if let Some(entry) = self.locks.iter_mut().find(|(i, _)| Arc::ptr_eq(i, index)) {
            entry.1 = LockMode::Write;
        }
    }

    pub(crate) fn log_insert(&mut self, index: Arc<Index>, key: Key, payload: Vec<u8>) {
        self.log.push(LogEntry::Insert {
            index,
            key,
            payload,
        });
    }

    pub(crate) fn log_delete(
        &mut self,
        index: Arc<Index>,
        key: Key,
        detached: Vec<PayloadEntry>,
    ) {
        self.log.push(LogEntry::Delete {
            index,
            key,
            detached,
        });
    }

    /// Release every lock this transaction holds and discard the log.
    /// Mutations are already live in the tries; nothing further to do.
    pub fn commit(mut self) {
        log::debug!("committing transaction {}", self.id);
        self.release_locks();
        self.log.clear();
    }

    /// Invert every logged operation, most recent first, then release
    /// locks. A failed inversion is logged and skipped rather than
    /// aborting the whole rollback (see `DESIGN.md`, Open Question d);
    /// if any step failed the overall result is `Err(Failure)`, matching
    /// a partial rollback.
    pub fn abort(mut self) -> StoreResult<()> {
        log::debug!("aborting transaction {}", self.id);
        let mut failures = 0u32;
        for entry in self.log.drain(..).rev() {
            match entry {
                LogEntry::Insert {
                    index,
                    key,
                    payload,
                } => {
                    let mut trie = index.trie.lock().unwrap();
                    if let Err(e) = trie.delete(&key, Some(&payload)) {
                        log::warn!(
                            "rollback: failed to undo insert on '{}': {e}",
                            index.name
                        );
                        failures += 1;
                    }
                }
                LogEntry::Delete {
                    index,
                    key,
                    detached,
                } => {
                    let mut trie = index.trie.lock().unwrap();
                    for entry in detached {
                        if let Err(e) = trie.restore(key.clone(), entry) {
                            log::warn!(
                                "rollback: failed to undo delete on '{}': {e}",
                                index.name
                            );
                            failures += 1;
                        }
                    }
                }
            }
        }
        self.release_locks();
        if failures > 0 {
            Err(StoreError::Failure {
                reason: format!("partial rollback: {failures} operation(s) failed to invert"),
            })
        } else {
            Ok(())
        }
    }

    fn release_locks(&mut self) {
        // `self.locks` only ever holds grants that were actually
        // acquired — a timed-out or failed-upgrade attempt is never
        // recorded (see `IndexHandle::acquire_read`/`acquire_write`) —
        // so releasing everything here is always correct, dead_lock or
        // not.
        for (index, mode) in self.locks.drain(..) {
            match mode {
                LockMode::Read => index.lock.release_read(),
                LockMode::Write => index.lock.release_write(),
            }
        }
    }
}
