// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Cursor positions over a burst trie.
//!
//! A cursor survives across `get`/`getNext` calls on the same handle.
//! Its "record pointer" is a payload sequence number rather than a list
//! index or raw pointer, which is what lets deletes elsewhere in the same
//! key's payload list happen without perturbing an in-flight scan (see
//! the crate-level docs for why this sidesteps the pointer-stability
//! problem entirely instead of patching it after the fact).

use crate::trie::node::{Arena, NodeId, TrieNode};

/// A cursor's position inside one burst trie.
#[derive(Debug, Clone, Copy)]
pub enum Cursor {
    /// Never positioned (fresh handle, or the last scan ran off the end).
    Unset,

    /// Resting after a `get`/`getNext` success, at `key_idx` within a
    /// Container (or `0` within a Nil), having yielded payload `last_seq`.
    /// The next `getNext` first looks for a payload after `last_seq`
    /// under the same key before moving to the next key.
    At {
        node: NodeId,
        key_idx: usize,
        last_seq: u64,
    },

    /// A `get` miss inside a Container or Nil: `key_idx` is where the
    /// missing key would sort (its insertion point). The next `getNext`
    /// yields whatever key is actually there, or rolls to `node.right`.
    Before { node: NodeId, key_idx: usize },

    /// A `get` miss that fell through a missing child link inside a Trie
    /// node, before ever reaching a Container/Nil. `child_pos` is the
    /// index the missing key would have occupied.
    TrieDeadEnd { trie_node: NodeId, child_pos: usize },

    /// A prior scan ran off the end of the index.
    End,
}

/// Resolve "the first real entry at-or-after `(node, key_idx)`", rolling
/// over to `node`'s right link when `key_idx` is out of bounds. Returns
/// `None` at the end of the index.
fn resolve_before(arena: &Arena, node: NodeId, key_idx: usize) -> Option<(NodeId, usize)> {
    let mut node = node;
    let mut key_idx = key_idx;
    loop {
        match arena.get(node) {
            TrieNode::Container(c) => {
                if key_idx < c.leaves.len() {
                    return Some((node, key_idx));
                }
                match c.right {
                    Some(next) => {
                        node = next;
                        key_idx = 0;
                    }
                    None => return None,
                }
            }
            TrieNode::Nil(n) => {
                if key_idx == 0 && n.leaf.is_some() {
                    return Some((node, 0));
                }
                match n.right {
                    Some(next) => {
                        node = next;
                        key_idx = 0;
                    }
                    None => return None,
                }
            }
            TrieNode::Trie(_) => unreachable!("cursor never rests on a Trie node"),
        }
    }
}

/// Leftmost leaf-bearing descendant of `node` (itself if already a leaf).
fn leftmost_leaf(arena: &Arena, node: NodeId) -> NodeId {
    let mut current = node;
    loop {
        match arena.get(current) {
            TrieNode::Trie(t) => current = t.head.and_then(|h| t.children[h]).expect(
                "a Trie node's size invariant guarantees head indexes a live child",
            ),
            _ => return current,
        }
    }
}

/// Rightmost leaf-bearing descendant of `node`.
fn rightmost_leaf(arena: &Arena, node: NodeId) -> NodeId {
    let mut current = node;
    loop {
        match arena.get(current) {
            TrieNode::Trie(t) => current = t.rear.and_then(|r| t.children[r]).expect(
                "a Trie node's size invariant guarantees rear indexes a live child",
            ),
            _ => return current,
        }
    }
}

/// Resolve a [`Cursor::TrieDeadEnd`] into the next real leaf position, per
/// the forward/backward search described in the module docs.
fn resolve_trie_dead_end(
    arena: &Arena,
    trie_node: NodeId,
    child_pos: usize,
) -> Option<(NodeId, usize)> {
    let t = match arena.get(trie_node) {
        TrieNode::Trie(t) => t,
        _ => unreachable!("TrieDeadEnd always names a Trie node"),
    };
    if let Some(idx) = t.next_nonempty_after(Some(child_pos)) {
        let child = t.children[idx].unwrap();
        let leaf = leftmost_leaf(arena, child);
        return Some((leaf, 0));
    }
    if let Some(rear) = t.rear {
        let child = t.children[rear].unwrap();
        let leaf = rightmost_leaf(arena, child);
        let right = match arena.get(leaf) {
            TrieNode::Container(c) => c.right,
            TrieNode::Nil(n) => n.right,
            TrieNode::Trie(_) => unreachable!(),
        };
        return right.map(|next| (next, 0));
    }
    None
}

impl Cursor {
    /// Advance the cursor and return the `(node, key_idx)` of the entry
    /// whose first remaining payload should be yielded, or `None` at the
    /// end of the index. Also returns whether this is a fresh key
    /// position (so the caller knows to read the leaf's first payload)
    /// or a continuation of the previous key's duplicates.
    pub fn advance(&self, arena: &Arena, root: NodeId) -> Option<CursorTarget> {
        match *self {
            Cursor::Unset => {
                let leaf = leftmost_leaf(arena, root);
                resolve_before(arena, leaf, 0).map(|(n, i)| CursorTarget::NewKey(n, i))
            }
            Cursor::At {
                node,
                key_idx,
                last_seq,
            } => {
                let same_key_next = match arena.get(node) {
                    TrieNode::Container(c) => c.leaves[key_idx].payloads.next_after(last_seq),
                    TrieNode::Nil(n) => n
                        .leaf
                        .as_ref()
                        .and_then(|l| l.payloads.next_after(last_seq)),
                    TrieNode::Trie(_) => unreachable!(),
                };
                if let Some(entry) = same_key_next {
                    return Some(CursorTarget::SameKey(node, key_idx, entry.seq));
                }
                resolve_before(arena, node, key_idx + 1).map(|(n, i)| CursorTarget::NewKey(n, i))
            }
            Cursor::Before { node, key_idx } => {
                resolve_before(arena, node, key_idx).map(|(n, i)| CursorTarget::NewKey(n, i))
            }
            Cursor::TrieDeadEnd {
                trie_node,
                child_pos,
            } => resolve_trie_dead_end(arena, trie_node, child_pos)
                .map(|(n, i)| CursorTarget::NewKey(n, i)),
            Cursor::End => None,
        }
    }
}

/// Result of [`Cursor::advance`]: either the next duplicate under the
/// key already being visited, or a freshly entered key.
pub enum CursorTarget {
    SameKey(NodeId, usize, u64),
    NewKey(NodeId, usize),
}
