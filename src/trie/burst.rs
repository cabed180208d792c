// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The burst trie engine: insert, get, getNext, delete, and the
//! burst-on-overflow and collapse-on-delete machinery that keeps a
//! Container/Trie/Nil tree balanced between sorted arrays and fan-out
//! nodes.

use crate::error::{StoreError, StoreResult};
use crate::key::{Key, KeyKind, TrieParams};
use crate::payload::PayloadList;
use crate::trie::cursor::{Cursor, CursorTarget};
use crate::trie::node::{Arena, ContainerNode, Leaf, NilNode, NodeId, TrieInnerNode, TrieNode};

/// An ordered, duplicate-permitting multimap from one [`KeyKind`] of key
/// to a list of byte-string payloads, backed by a burst trie.
#[derive(Debug)]
pub struct BurstTrie {
    pub kind: KeyKind,
    pub params: TrieParams,
    arena: Arena,
    root: NodeId,
}

/// One (key, payload) pair returned by `get`/`getNext`.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: Key,
    pub payload: Vec<u8>,
}

impl BurstTrie {
    pub fn new(kind: KeyKind) -> Self {
        let params = TrieParams::for_kind(kind);
        let mut arena = Arena::new();
        let root = arena.alloc(TrieNode::Container(ContainerNode {
            depth: 0,
            leaves: Vec::new(),
            left: None,
            right: None,
        }));
        BurstTrie {
            kind,
            params,
            arena,
            root,
        }
    }

    fn is_nil_slot(&self, pos: usize) -> bool {
        self.kind == KeyKind::VarBytes && pos == 0
    }

    // ---- insert ---------------------------------------------------

    pub fn insert(&mut self, key: Key, payload: Vec<u8>) -> StoreResult<()> {
        debug_assert_eq!(key.kind(), self.kind);
        let mut current = self.root;

        loop {
            match self.arena.get(current) {
                TrieNode::Trie(_) => {
                    let depth = self.arena.get(current).depth();
                    let pos = key.child_index_at_depth(depth);
                    let child = match self.arena.get(current) {
                        TrieNode::Trie(t) => t.children[pos],
                        _ => unreachable!(),
                    };
                    match child {
                        Some(child_id) => {
                            current = child_id;
                        }
                        None => {
                            let new_id = self.create_and_link_leaf(current, pos, depth + 1);
                            return self.insert_into_fresh_leaf(new_id, key, payload);
                        }
                    }
                }
                TrieNode::Nil(_) => {
                    let leaf_full = self.arena.get_mut(current).as_nil_mut().unwrap();
                    match &mut leaf_full.leaf {
                        Some(leaf) => {
                            return match leaf.payloads.push(payload) {
                                Some(_) => Ok(()),
                                None => Err(StoreError::EntryExists {
                                    index: String::new(),
                                }),
                            };
                        }
                        None => {
                            let mut payloads = PayloadList::new();
                            payloads.push(payload);
                            leaf_full.leaf = Some(Leaf { key, payloads });
                            return Ok(());
                        }
                    }
                }
                TrieNode::Container(_) => {
                    let depth = self.arena.get(current).depth();
                    let params = self.params;
                    let search = {
                        let c = self.arena.get(current).as_container().unwrap();
                        c.leaves.binary_search_by(|l| l.key.cmp(&key))
                    };
                    match search {
                        Ok(idx) => {
                            let c = self.arena.get_mut(current).as_container_mut().unwrap();
                            return match c.leaves[idx].payloads.push(payload) {
                                Some(_) => Ok(()),
                                None => Err(StoreError::EntryExists {
                                    index: String::new(),
                                }),
                            };
                        }
                        Err(insert_at) => {
                            let len = self.arena.get(current).as_container().unwrap().leaves.len();
                            if len < params.container_cap {
                                let mut payloads = PayloadList::new();
                                payloads.push(payload);
                                let c = self.arena.get_mut(current).as_container_mut().unwrap();
                                c.leaves.insert(insert_at, Leaf { key, payloads });
                                return Ok(());
                            }
                            if depth >= params.max_depth {
                                return Err(StoreError::Failure {
                                    reason: "burst exceeded maximum trie depth".into(),
                                });
                            }
                            self.burst(current, depth);
                            // retry against the same node, now a Trie.
                        }
                    }
                }
            }
        }
    }

    fn insert_into_fresh_leaf(
        &mut self,
        node: NodeId,
        key: Key,
        payload: Vec<u8>,
    ) -> StoreResult<()> {
        let mut payloads = PayloadList::new();
        payloads.push(payload);
        match self.arena.get_mut(node) {
            TrieNode::Nil(n) => n.leaf = Some(Leaf { key, payloads }),
            TrieNode::Container(c) => c.leaves.push(Leaf { key, payloads }),
            TrieNode::Trie(_) => unreachable!("freshly created leaf is never a Trie"),
        }
        Ok(())
    }

    /// Re-insert a payload detached by an earlier `delete`, preserving its
    /// original sequence number rather than assigning a fresh one. Used
    /// by transaction rollback so a cursor holding that seq stays valid
    /// across an abort. Otherwise descends exactly like `insert`.
    pub fn restore(&mut self, key: Key, entry: crate::payload::PayloadEntry) -> StoreResult<()> {
        debug_assert_eq!(key.kind(), self.kind);
        let mut current = self.root;

        loop {
            match self.arena.get(current) {
                TrieNode::Trie(_) => {
                    let depth = self.arena.get(current).depth();
                    let pos = key.child_index_at_depth(depth);
                    let child = match self.arena.get(current) {
                        TrieNode::Trie(t) => t.children[pos],
                        _ => unreachable!(),
                    };
                    match child {
                        Some(child_id) => current = child_id,
                        None => {
                            let new_id = self.create_and_link_leaf(current, pos, depth + 1);
                            return self.restore_into_fresh_leaf(new_id, key, entry);
                        }
                    }
                }
                TrieNode::Nil(_) => {
                    let leaf_full = self.arena.get_mut(current).as_nil_mut().unwrap();
                    match &mut leaf_full.leaf {
                        Some(leaf) => {
                            leaf.payloads.restore(entry);
                            return Ok(());
                        }
                        None => {
                            let mut payloads = PayloadList::new();
                            payloads.restore(entry);
                            leaf_full.leaf = Some(Leaf { key, payloads });
                            return Ok(());
                        }
                    }
                }
                TrieNode::Container(_) => {
                    let depth = self.arena.get(current).depth();
                    let params = self.params;
                    let search = {
                        let c = self.arena.get(current).as_container().unwrap();
                        c.leaves.binary_search_by(|l| l.key.cmp(&key))
                    };
                    match search {
                        Ok(idx) => {
                            let c = self.arena.get_mut(current).as_container_mut().unwrap();
                            c.leaves[idx].payloads.restore(entry);
                            return Ok(());
                        }
                        Err(insert_at) => {
                            let len = self.arena.get(current).as_container().unwrap().leaves.len();
                            if len < params.container_cap {
                                let mut payloads = PayloadList::new();
                                payloads.restore(entry);
                                let c = self.arena.get_mut(current).as_container_mut().unwrap();
                                c.leaves.insert(insert_at, Leaf { key, payloads });
                                return Ok(());
                            }
                            if depth >= params.max_depth {
                                return Err(StoreError::Failure {
                                    reason: "burst exceeded maximum trie depth".into(),
                                });
                            }
                            self.burst(current, depth);
                            // retry against the same node, now a Trie.
                        }
                    }
                }
            }
        }
    }

    fn restore_into_fresh_leaf(
        &mut self,
        node: NodeId,
        key: Key,
        entry: crate::payload::PayloadEntry,
    ) -> StoreResult<()> {
        let mut payloads = PayloadList::new();
        payloads.restore(entry);
        match self.arena.get_mut(node) {
            TrieNode::Nil(n) => n.leaf = Some(Leaf { key, payloads }),
            TrieNode::Container(c) => c.leaves.push(Leaf { key, payloads }),
            TrieNode::Trie(_) => unreachable!("freshly created leaf is never a Trie"),
        }
        Ok(())
    }

    /// Allocate a fresh empty Container (or Nil, for the VarBytes
    /// terminator slot) as child `pos` of `parent`, splicing it into the
    /// global doubly-linked leaf list using the parent's nearest
    /// occupied sibling, per the parent's bucket counters.
    fn create_and_link_leaf(&mut self, parent: NodeId, pos: usize, depth: usize) -> NodeId {
        let new_id = if self.is_nil_slot(pos) {
            self.arena.alloc(TrieNode::Nil(NilNode {
                depth,
                leaf: None,
                left: None,
                right: None,
            }))
        } else {
            self.arena.alloc(TrieNode::Container(ContainerNode {
                depth,
                leaves: Vec::new(),
                left: None,
                right: None,
            }))
        };

        let (forward, sibling_child) = {
            let t = match self.arena.get(parent) {
                TrieNode::Trie(t) => t,
                _ => unreachable!("create_and_link_leaf always runs under a Trie parent"),
            };
            match t.next_nonempty_after(Some(pos)) {
                Some(idx) => (true, t.children[idx].unwrap()),
                None => {
                    let idx = t
                        .prev_nonempty_before(pos)
                        .expect("a Trie parent mid-burst always has another live child");
                    (false, t.children[idx].unwrap())
                }
            }
        };

        if forward {
            let anchor = leftmost_leaf(&self.arena, sibling_child);
            let anchor_left = leaf_left(&self.arena, anchor);
            set_leaf_right(&mut self.arena, new_id, Some(anchor));
            set_leaf_left(&mut self.arena, new_id, anchor_left);
            if let Some(al) = anchor_left {
                set_leaf_right(&mut self.arena, al, Some(new_id));
            }
            set_leaf_left(&mut self.arena, anchor, Some(new_id));
        } else {
            let anchor = rightmost_leaf(&self.arena, sibling_child);
            let anchor_right = leaf_right(&self.arena, anchor);
            set_leaf_left(&mut self.arena, new_id, Some(anchor));
            set_leaf_right(&mut self.arena, new_id, anchor_right);
            if let Some(ar) = anchor_right {
                set_leaf_left(&mut self.arena, ar, Some(new_id));
            }
            set_leaf_right(&mut self.arena, anchor, Some(new_id));
        }

        match self.arena.get_mut(parent) {
            TrieNode::Trie(t) => t.set_child(pos, new_id),
            _ => unreachable!(),
        }
        new_id
    }

    /// Convert the full Container at `node` (at `depth`) into a Trie,
    /// redistributing its leaves by their byte at `depth`.
    fn burst(&mut self, node: NodeId, depth: usize) {
        log::trace!("bursting container at depth {depth}");
        let old = match std::mem::replace(
            self.arena.get_mut(node),
            TrieNode::Trie(TrieInnerNode::new(depth, self.params.width, self.params.counter_buckets)),
        ) {
            TrieNode::Container(c) => c,
            _ => unreachable!("burst only runs on a Container"),
        };

        let outer_left = old.left;
        let outer_right = old.right;
        let mut prev: Option<NodeId> = outer_left;

        for leaf in old.leaves {
            let pos = leaf.key.child_index_at_depth(depth);
            let existing = match self.arena.get(node) {
                TrieNode::Trie(t) => t.children[pos],
                _ => unreachable!(),
            };
            match existing {
                Some(child_id) => match self.arena.get_mut(child_id) {
                    TrieNode::Container(c) => c.leaves.push(leaf),
                    TrieNode::Nil(n) => n.leaf = Some(leaf),
                    TrieNode::Trie(_) => unreachable!(),
                },
                None => {
                    let is_nil = self.is_nil_slot(pos);
                    let child_id = if is_nil {
                        self.arena.alloc(TrieNode::Nil(NilNode {
                            depth: depth + 1,
                            leaf: Some(leaf),
                            left: prev,
                            right: None,
                        }))
                    } else {
                        self.arena.alloc(TrieNode::Container(ContainerNode {
                            depth: depth + 1,
                            leaves: vec![leaf],
                            left: prev,
                            right: None,
                        }))
                    };
                    if let Some(p) = prev {
                        set_leaf_right(&mut self.arena, p, Some(child_id));
                    }
                    prev = Some(child_id);
                    match self.arena.get_mut(node) {
                        TrieNode::Trie(t) => t.set_child(pos, child_id),
                        _ => unreachable!(),
                    }
                }
            }
        }

        if let Some(p) = prev {
            set_leaf_right(&mut self.arena, p, outer_right);
        }
        if let Some(r) = outer_right {
            set_leaf_left(&mut self.arena, r, prev);
        }
    }

    // ---- get / getNext ---------------------------------------------

    pub fn get(&self, key: &Key) -> (StoreResult<Record>, Cursor) {
        debug_assert_eq!(key.kind(), self.kind);
        let mut current = self.root;
        loop {
            match self.arena.get(current) {
                TrieNode::Trie(t) => {
                    let pos = key.child_index_at_depth(t.depth);
                    match t.children[pos] {
                        Some(child_id) => current = child_id,
                        None => {
                            let cursor = Cursor::TrieDeadEnd {
                                trie_node: current,
                                child_pos: pos,
                            };
                            return (
                                Err(StoreError::KeyNotFound {
                                    index: String::new(),
                                }),
                                cursor,
                            );
                        }
                    }
                }
                TrieNode::Nil(n) => {
                    return match &n.leaf {
                        Some(leaf) if &leaf.key == key => {
                            let first = leaf.payloads.first().expect("Nil leaf always has >=1 payload");
                            (
                                Ok(Record {
                                    key: key.clone(),
                                    payload: first.bytes.clone(),
                                }),
                                Cursor::At {
                                    node: current,
                                    key_idx: 0,
                                    last_seq: first.seq,
                                },
                            )
                        }
                        _ => (
                            Err(StoreError::KeyNotFound {
                                index: String::new(),
                            }),
                            Cursor::Before {
                                node: current,
                                key_idx: 0,
                            },
                        ),
                    };
                }
                TrieNode::Container(c) => {
                    return match c.leaves.binary_search_by(|l| l.key.cmp(key)) {
                        Ok(idx) => {
                            let first = c.leaves[idx]
                                .payloads
                                .first()
                                .expect("a stored key always has >=1 payload");
                            (
                                Ok(Record {
                                    key: key.clone(),
                                    payload: first.bytes.clone(),
                                }),
                                Cursor::At {
                                    node: current,
                                    key_idx: idx,
                                    last_seq: first.seq,
                                },
                            )
                        }
                        Err(insert_at) => (
                            Err(StoreError::KeyNotFound {
                                index: String::new(),
                            }),
                            Cursor::Before {
                                node: current,
                                key_idx: insert_at,
                            },
                        ),
                    };
                }
            }
        }
    }

    pub fn get_next(&self, cursor: &Cursor) -> (StoreResult<Record>, Cursor) {
        match cursor.advance(&self.arena, self.root) {
            None => (
                Err(StoreError::DbEnd {
                    index: String::new(),
                }),
                Cursor::End,
            ),
            Some(CursorTarget::SameKey(node, key_idx, seq)) => {
                let key = leaf_key(&self.arena, node, key_idx).clone();
                let bytes = leaf_payloads(&self.arena, node, key_idx)
                    .find_seq(seq)
                    .expect("advance() only returns seqs present in the list")
                    .bytes
                    .clone();
                (
                    Ok(Record { key, payload: bytes }),
                    Cursor::At {
                        node,
                        key_idx,
                        last_seq: seq,
                    },
                )
            }
            Some(CursorTarget::NewKey(node, key_idx)) => {
                let key = leaf_key(&self.arena, node, key_idx).clone();
                let first = leaf_payloads(&self.arena, node, key_idx)
                    .first()
                    .expect("a stored key always has >=1 payload");
                let seq = first.seq;
                let bytes = first.bytes.clone();
                (
                    Ok(Record { key, payload: bytes }),
                    Cursor::At {
                        node,
                        key_idx,
                        last_seq: seq,
                    },
                )
            }
        }
    }

    // ---- delete ------------------------------------------------------

    /// Delete `payload` under `key` (or every payload, if `payload` is
    /// `None`). Returns the detached entries for rollback use.
    pub fn delete(
        &mut self,
        key: &Key,
        payload: Option<&[u8]>,
    ) -> StoreResult<Vec<crate::payload::PayloadEntry>> {
        debug_assert_eq!(key.kind(), self.kind);
        if self.arena.get(self.root).size() == 0 {
            return Err(StoreError::KeyNotFound {
                index: String::new(),
            });
        }

        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        let mut current = self.root;

        loop {
            match self.arena.get(current) {
                TrieNode::Trie(t) => {
                    let pos = key.child_index_at_depth(t.depth);
                    match t.children[pos] {
                        Some(child_id) => {
                            stack.push((current, pos));
                            current = child_id;
                        }
                        None => {
                            return Err(StoreError::KeyNotFound {
                                index: String::new(),
                            })
                        }
                    }
                }
                TrieNode::Nil(n) => {
                    if !matches!(&n.leaf, Some(leaf) if &leaf.key == key) {
                        return Err(StoreError::KeyNotFound {
                            index: String::new(),
                        });
                    }
                    let n = self.arena.get_mut(current).as_nil_mut().unwrap();
                    let leaf = n.leaf.as_mut().unwrap();
                    let detached = match payload {
                        Some(bytes) => leaf
                            .payloads
                            .remove_matching(bytes)
                            .map(|e| vec![e])
                            .ok_or(StoreError::KeyNotFound {
                                index: String::new(),
                            })?,
                        None => leaf.payloads.drain_all(),
                    };
                    if leaf.payloads.is_empty() {
                        n.leaf = None;
                        self.collapse(current, stack);
                    }
                    return Ok(detached);
                }
                TrieNode::Container(_) => {
                    let idx = self
                        .arena
                        .get(current)
                        .as_container()
                        .unwrap()
                        .leaves
                        .binary_search_by(|l| l.key.cmp(key))
                        .map_err(|_| StoreError::KeyNotFound {
                            index: String::new(),
                        })?;
                    let c = self.arena.get_mut(current).as_container_mut().unwrap();
                    let detached = match payload {
                        Some(bytes) => c.leaves[idx]
                            .payloads
                            .remove_matching(bytes)
                            .map(|e| vec![e])
                            .ok_or(StoreError::KeyNotFound {
                                index: String::new(),
                            })?,
                        None => c.leaves[idx].payloads.drain_all(),
                    };
                    let now_empty = c.leaves[idx].payloads.is_empty();
                    if now_empty {
                        c.leaves.remove(idx);
                        self.collapse(current, stack);
                    }
                    return Ok(detached);
                }
            }
        }
    }

    /// After a leaf-bearing node's size drops to 0: unlink it from the
    /// global list, free it, then walk the ancestor stack freeing any
    /// Trie node whose size also drops to 0, until reaching a still
    /// non-empty ancestor or the root.
    fn collapse(&mut self, empty_node: NodeId, mut stack: Vec<(NodeId, usize)>) {
        let (left, right) = match self.arena.get(empty_node) {
            TrieNode::Container(c) => (c.left, c.right),
            TrieNode::Nil(n) => (n.left, n.right),
            TrieNode::Trie(_) => unreachable!(),
        };
        if let Some(l) = left {
            set_leaf_right(&mut self.arena, l, right);
        }
        if let Some(r) = right {
            set_leaf_left(&mut self.arena, r, left);
        }
        self.arena.free(empty_node);

        while let Some((parent, pos)) = stack.pop() {
            match self.arena.get_mut(parent) {
                TrieNode::Trie(t) => t.clear_child(pos),
                _ => unreachable!(),
            }
            let parent_size = self.arena.get(parent).size();
            if parent_size > 0 || parent == self.root {
                if parent == self.root && parent_size == 0 {
                    self.reset_root_to_container();
                }
                return;
            }
            self.arena.free(parent);
        }
    }

    fn reset_root_to_container(&mut self) {
        let depth = self.arena.get(self.root).depth();
        *self.arena.get_mut(self.root) = TrieNode::Container(ContainerNode {
            depth,
            leaves: Vec::new(),
            left: None,
            right: None,
        });
    }

    #[cfg(test)]
    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    #[cfg(test)]
    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }
}

fn leftmost_leaf(arena: &Arena, node: NodeId) -> NodeId {
    let mut current = node;
    loop {
        match arena.get(current) {
            TrieNode::Trie(t) => {
                current = t.head.and_then(|h| t.children[h]).expect("non-empty Trie")
            }
            _ => return current,
        }
    }
}

fn rightmost_leaf(arena: &Arena, node: NodeId) -> NodeId {
    let mut current = node;
    loop {
        match arena.get(current) {
            TrieNode::Trie(t) => {
                current = t.rear.and_then(|r| t.children[r]).expect("non-empty Trie")
            }
            _ => return current,
        }
    }
}

fn leaf_left(arena: &Arena, node: NodeId) -> Option<NodeId> {
    match arena.get(node) {
        TrieNode::Container(c) => c.left,
        TrieNode::Nil(n) => n.left,
        TrieNode::Trie(_) => unreachable!(),
    }
}

fn leaf_right(arena: &Arena, node: NodeId) -> Option<NodeId> {
    match arena.get(node) {
        TrieNode::Container(c) => c.right,
        TrieNode::Nil(n) => n.right,
        TrieNode::Trie(_) => unreachable!(),
    }
}

fn set_leaf_left(arena: &mut Arena, node: NodeId, left: Option<NodeId>) {
    arena.get_mut(node).set_left(left);
}

fn set_leaf_right(arena: &mut Arena, node: NodeId, right: Option<NodeId>) {
    arena.get_mut(node).set_right(right);
}

fn leaf_key(arena: &Arena, node: NodeId, key_idx: usize) -> &Key {
    match arena.get(node) {
        TrieNode::Container(c) => &c.leaves[key_idx].key,
        TrieNode::Nil(n) => &n.leaf.as_ref().expect("dead Nil leaf").key,
        TrieNode::Trie(_) => unreachable!(),
    }
}

fn leaf_payloads(arena: &Arena, node: NodeId, key_idx: usize) -> &PayloadList {
    match arena.get(node) {
        TrieNode::Container(c) => &c.leaves[key_idx].payloads,
        TrieNode::Nil(n) => &n.leaf.as_ref().expect("dead Nil leaf").payloads,
        TrieNode::Trie(_) => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_keys(trie: &BurstTrie) -> Vec<Key> {
        let mut out = Vec::new();
        let mut cursor = Cursor::Unset;
        loop {
            let (result, next) = trie.get_next(&cursor);
            cursor = next;
            match result {
                Ok(record) => out.push(record.key),
                Err(_) => break,
            }
        }
        out
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let mut trie = BurstTrie::new(KeyKind::Int64);
        trie.insert(Key::Int64(42), b"hello".to_vec()).unwrap();
        let (result, _) = trie.get(&Key::Int64(42));
        assert_eq!(result.unwrap().payload, b"hello");
    }

    #[test]
    fn get_missing_key_is_key_not_found() {
        let trie = BurstTrie::new(KeyKind::Int64);
        let (result, _) = trie.get(&Key::Int64(1));
        assert!(matches!(result, Err(StoreError::KeyNotFound { .. })));
    }

    #[test]
    fn duplicate_payload_is_rejected() {
        let mut trie = BurstTrie::new(KeyKind::Int64);
        trie.insert(Key::Int64(1), b"a".to_vec()).unwrap();
        let err = trie.insert(Key::Int64(1), b"a".to_vec()).unwrap_err();
        assert!(matches!(err, StoreError::EntryExists { .. }));
    }

    #[test]
    fn burst_preserves_ascending_order() {
        let mut trie = BurstTrie::new(KeyKind::Int64);
        let mut keys: Vec<i64> = (0..500).collect();
        // Insert out of order so ordering is actually exercised by the
        // structure, not just by insertion order.
        keys.sort_by_key(|k| (k * 2654435761u32 as i64) % 997);
        for &k in &keys {
            trie.insert(Key::Int64(k), b"p".to_vec()).unwrap();
        }

        let scanned: Vec<i64> = drain_keys(&trie)
            .into_iter()
            .map(|k| match k {
                Key::Int64(v) => v,
                _ => unreachable!(),
            })
            .collect();

        let mut expected: Vec<i64> = (0..500).collect();
        expected.sort();
        assert_eq!(scanned, expected);
    }

    #[test]
    fn integer_boundaries_sort_correctly() {
        let mut trie = BurstTrie::new(KeyKind::Int64);
        for k in [0i64, -1, i64::MIN, i64::MAX, 1] {
            trie.insert(Key::Int64(k), b"p".to_vec()).unwrap();
        }
        let scanned: Vec<i64> = drain_keys(&trie)
            .into_iter()
            .map(|k| match k {
                Key::Int64(v) => v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(scanned, vec![i64::MIN, -1, 0, 1, i64::MAX]);
    }

    #[test]
    fn delete_collapses_empty_containers_without_freeing_root() {
        let mut trie = BurstTrie::new(KeyKind::Int64);
        trie.insert(Key::Int64(1), b"p".to_vec()).unwrap();
        trie.delete(&Key::Int64(1), None).unwrap();

        assert_eq!(trie.arena().get(trie.root_id()).size(), 0);
        let (result, _) = trie.get(&Key::Int64(1));
        assert!(matches!(result, Err(StoreError::KeyNotFound { .. })));
    }

    #[test]
    fn delete_one_payload_leaves_others_under_the_same_key() {
        let mut trie = BurstTrie::new(KeyKind::Int64);
        trie.insert(Key::Int64(1), b"a".to_vec()).unwrap();
        trie.insert(Key::Int64(1), b"b".to_vec()).unwrap();
        trie.delete(&Key::Int64(1), Some(b"a")).unwrap();

        let (result, _) = trie.get(&Key::Int64(1));
        assert_eq!(result.unwrap().payload, b"b");
    }

    #[test]
    fn varbytes_empty_key_lands_on_nil_terminator() {
        let mut trie = BurstTrie::new(KeyKind::VarBytes);
        let empty = Key::var_bytes(Vec::new()).unwrap();
        trie.insert(empty.clone(), b"p".to_vec()).unwrap();
        let (result, _) = trie.get(&empty);
        assert_eq!(result.unwrap().payload, b"p");
    }

    #[test]
    fn container_bursts_at_capacity_and_accepts_overflow() {
        let mut trie = BurstTrie::new(KeyKind::VarBytes);
        let cap = crate::key::TrieParams::for_kind(KeyKind::VarBytes).container_cap;
        for i in 0..(cap + 1) {
            let key = Key::var_bytes(vec![b'C', 65 + i as u8]).unwrap();
            trie.insert(key, b"p".to_vec()).unwrap();
        }
        assert_eq!(drain_keys(&trie).len(), cap + 1);
    }

    #[test]
    fn get_next_on_empty_trie_is_db_end() {
        let trie = BurstTrie::new(KeyKind::Int64);
        let (result, _) = trie.get_next(&Cursor::Unset);
        assert!(matches!(result, Err(StoreError::DbEnd { .. })));
    }
}
