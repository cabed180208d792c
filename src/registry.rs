// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The process-wide index registry: name → index lookup, guarded by one
//! mutex so `create`/`open` never race each other.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     IndexRegistry                       │
//! │           Mutex<HashMap<String, Arc<Index>>>            │
//! └──────────────────────┬───────────────────────────────────┘
//!                        │ open()
//!                        ▼
//!               Arc<Index> ── Mutex<BurstTrie>
//!                         └── IndexLock (reader/writer)
//! ```
//!
//! The registry mutex is held only long enough to insert or clone an
//! `Arc`; all engine work happens after it is released.

use crate::concurrent::IndexLock;
use crate::error::{StoreError, StoreResult};
use crate::handle::IndexHandle;
use crate::key::KeyKind;
use crate::trie::BurstTrie;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One registered index: its trie behind a plain mutex, plus its own
/// reader/writer lock for transaction-scoped acquisition.
pub struct Index {
    pub name: String,
    pub kind: KeyKind,
    pub(crate) trie: Mutex<BurstTrie>,
    pub(crate) lock: IndexLock,
}

/// Process-wide name → index map.
#[derive(Default)]
pub struct IndexRegistry {
    indexes: Mutex<HashMap<String, Arc<Index>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        IndexRegistry::default()
    }

    /// Register a new, empty index of `kind` under `name`.
    ///
    /// ## Error Conditions
    /// Returns [`StoreError::IndexExists`] if `name` is already taken.
    pub fn create(&self, name: &str, kind: KeyKind) -> StoreResult<()> {
        let mut indexes = self.indexes.lock().unwrap();
        if indexes.contains_key(name) {
            return Err(StoreError::IndexExists { name: name.into() });
        }
        indexes.insert(
            name.to_string(),
            Arc::new(Index {
                name: name.to_string(),
                kind,
                trie: Mutex::new(BurstTrie::new(kind)),
                lock: IndexLock::new(name),
            }),
        );
        Ok(())
    }

    /// Open a fresh handle bound to the named index.
    ///
    /// ## Error Conditions
    /// Returns [`StoreError::IndexNotFound`] if no such index was created.
    pub fn open(&self, name: &str) -> StoreResult<IndexHandle> {
        let indexes = self.indexes.lock().unwrap();
        let index = indexes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::IndexNotFound { name: name.into() })?;
        Ok(IndexHandle::new(index))
    }
}
