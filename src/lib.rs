// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! `burstdb` — an in-process, multi-threaded, duplicate-permitting
//! ordered index store backed by a burst trie.
//!
//! ## Quick Start
//!
//! ```rust
//! use burstdb::{IndexRegistry, Key, KeyKind};
//!
//! let registry = IndexRegistry::new();
//! registry.create("users", KeyKind::Int64).unwrap();
//!
//! let mut handle = registry.open("users").unwrap();
//! handle.insert(None, Key::Int64(42), b"alice".to_vec()).unwrap();
//!
//! let record = handle.get(None, &Key::Int64(42)).unwrap();
//! assert_eq!(record.payload, b"alice");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      IndexRegistry                         │
//! │                name → Arc<Index>, one mutex                │
//! └───────────────────────┬────────────────────────────────────┘
//!                         │ open()
//!                         ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                       IndexHandle                           │
//! │        cursor · last_key · dead_lock flag                   │
//! └───────┬───────────────────────────────────────┬─────────────┘
//!         │ get / getNext (shared)                │ insert / delete (exclusive)
//!         ▼                                        ▼
//! ┌────────────────────┐                 ┌──────────────────────┐
//! │      IndexLock      │                 │   Mutex<BurstTrie>    │
//! │  reader/writer,      │                 │  Container/Trie/Nil   │
//! │  ~80ms deadline      │                 │  arena, burst+collapse│
//! └────────────────────┘                 └──────────────────────┘
//! ```
//!
//! A [`Transaction`] batches a sequence of operations across one or more
//! handles: it owns the lock grants those operations acquired and the
//! log needed to invert them on [`Transaction::abort`].

pub mod concurrent;
pub mod error;
pub mod handle;
pub mod key;
pub mod payload;
pub mod registry;
pub mod transaction;
pub mod trie;

pub use error::{StoreError, StoreResult};
pub use handle::IndexHandle;
pub use key::{Key, KeyKind, TrieParams};
pub use payload::PayloadEntry;
pub use registry::{Index, IndexRegistry};
pub use transaction::Transaction;
pub use trie::{BurstTrie, Cursor, Record};
