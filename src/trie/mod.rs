// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Burst trie: an ordered, duplicate-permitting container that adapts
//! between small sorted Container leaves and fan-out Trie nodes.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       BurstTrie                         │
//! │  kind, params (max_depth/width/container_cap/buckets)  │
//! ├────────────────────────────────────────────────────────┤
//! │  Arena<TrieNode>                                        │
//! │                                                          │
//! │        Trie ──┬── Container ↔ Container ↔ Nil           │
//! │                │         (global doubly-linked list)    │
//! │                └── Trie ── Container ↔ Container         │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! A Container holds a sorted array of leaves and bursts into a Trie once
//! it reaches the kind's container capacity. All Containers and Nils are
//! additionally threaded through a flat doubly-linked list so a full
//! ascending scan never needs to re-descend the tree.

mod burst;
mod cursor;
mod node;

pub use burst::{BurstTrie, Record};
pub use cursor::Cursor;
pub use node::{Arena, NodeId};
