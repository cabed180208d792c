// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Key types and per-kind tuning parameters for the burst trie.
//!
//! Three key kinds are supported, matching the three kinds a single burst
//! trie admits for its entire lifetime: a 32-bit signed integer, a 64-bit
//! signed integer, and a bounded, null-terminated byte string.

use crate::error::{StoreError, StoreResult};
use std::cmp::Ordering;
use std::fmt;

/// Upper bound on the length of a `Key::VarBytes` payload, including the
/// implicit terminator.
pub const MAX_VARBYTES: usize = 255;

/// Which of the three fixed key kinds an index stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Short32,
    Int64,
    VarBytes,
}

/// A key value tagged by kind.
///
/// `VarBytes` bytes must fall in `[65, 127]` (so that `byte - 64` maps into
/// `[1, 63]`, i.e. the non-terminator child indices of a width-64 trie —
/// see [`TrieParams::for_kind`]); byte `0` is reserved as the string
/// terminator and is never stored explicitly, it is implied by the end of
/// the slice. Bytes `1..=64` would themselves saturate to child index `0`,
/// colliding with that terminator slot, and bytes above `127` would index
/// past the end of a width-64 child array, so both are rejected too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Short32(i32),
    Int64(i64),
    VarBytes(Vec<u8>),
}

impl Key {
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::Short32(_) => KeyKind::Short32,
            Key::Int64(_) => KeyKind::Int64,
            Key::VarBytes(_) => KeyKind::VarBytes,
        }
    }

    /// Construct a validated `VarBytes` key, checking every byte is in the
    /// range this trie's encoding can represent.
    pub fn var_bytes(bytes: impl Into<Vec<u8>>) -> StoreResult<Key> {
        let bytes = bytes.into();
        if bytes.len() >= MAX_VARBYTES {
            return Err(StoreError::KeyOutOfRange {
                reason: format!("VarBytes key longer than {MAX_VARBYTES} bytes"),
            });
        }
        for &b in &bytes {
            if !(65..=127).contains(&b) {
                return Err(StoreError::KeyOutOfRange {
                    reason: format!("VarBytes byte {b} outside encodable range [65, 127]"),
                });
            }
        }
        Ok(Key::VarBytes(bytes))
    }

    /// The byte used to select a child at trie `depth`, starting at 0.
    ///
    /// For integer kinds this is the depth-th most significant byte, with
    /// the most significant byte additionally biased so negative values
    /// sort before non-negative ones. For `VarBytes` it is byte `depth` of
    /// the string, or the terminator byte `0` once depth reaches the
    /// string's length.
    pub fn byte_at_depth(&self, depth: usize) -> u8 {
        match self {
            Key::Short32(v) => {
                let be = v.to_be_bytes();
                let mut b = be[depth] as i8 as i32;
                if depth == 0 {
                    b += 128;
                }
                b as u8
            }
            Key::Int64(v) => {
                let be = v.to_be_bytes();
                let mut b = be[depth] as i8 as i32;
                if depth == 0 {
                    b += 128;
                }
                b as u8
            }
            Key::VarBytes(bytes) => bytes.get(depth).copied().unwrap_or(0),
        }
    }

    /// Map a depth byte to a trie child index: byte `0` (terminator) maps
    /// to index `0`, everything else maps per kind.
    pub fn child_index_for_byte(kind: KeyKind, byte: u8) -> usize {
        match kind {
            KeyKind::Short32 | KeyKind::Int64 => byte as usize,
            KeyKind::VarBytes => {
                if byte == 0 {
                    0
                } else {
                    (byte as usize).saturating_sub(64)
                }
            }
        }
    }

    pub fn child_index_at_depth(&self, depth: usize) -> usize {
        Key::child_index_for_byte(self.kind(), self.byte_at_depth(depth))
    }

    /// Total length in bytes this key contributes to trie depth (integer
    /// kinds are fixed-width; `VarBytes` is its slice length).
    pub fn byte_len(&self) -> usize {
        match self {
            Key::Short32(_) => 4,
            Key::Int64(_) => 8,
            Key::VarBytes(b) => b.len(),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Short32(a), Key::Short32(b)) => a.cmp(b),
            (Key::Int64(a), Key::Int64(b)) => a.cmp(b),
            (Key::VarBytes(a), Key::VarBytes(b)) => a.cmp(b),
            _ => panic!("compared keys of different kinds"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Short32(v) => write!(f, "{v}"),
            Key::Int64(v) => write!(f, "{v}"),
            Key::VarBytes(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
        }
    }
}

/// Per-kind tuning constants: maximum trie depth, child fan-out width,
/// container capacity, and bucket-counter granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieParams {
    pub max_depth: usize,
    pub width: usize,
    pub container_cap: usize,
    pub counter_buckets: usize,
}

impl TrieParams {
    pub fn for_kind(kind: KeyKind) -> TrieParams {
        let params = match kind {
            KeyKind::Short32 => TrieParams {
                max_depth: 4,
                width: 256,
                container_cap: 256,
                counter_buckets: 16,
            },
            KeyKind::Int64 => TrieParams {
                max_depth: 8,
                width: 256,
                container_cap: 256,
                counter_buckets: 16,
            },
            KeyKind::VarBytes => TrieParams {
                max_depth: MAX_VARBYTES,
                width: 64,
                container_cap: 12,
                counter_buckets: 8,
            },
        };
        debug_assert_eq!(params.width % params.counter_buckets, 0);
        debug_assert!(params.container_cap >= 1);
        params
    }
}
