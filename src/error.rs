// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the burst trie index store.

use std::fmt;

/// All failure modes surfaced by this crate.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// No entry exists for the given key.
    KeyNotFound { index: String },

    /// The exact payload already exists under this key.
    EntryExists { index: String },

    /// A cursor scan has reached the end of the index.
    DbEnd { index: String },

    /// Lock acquisition timed out; the caller must abort its transaction.
    Deadlock { index: String, timeout_ms: u64 },

    /// `create` was called with a name already present in the registry.
    IndexExists { name: String },

    /// `open`/`close`/lookup referenced a name absent from the registry.
    IndexNotFound { name: String },

    /// A transaction operation referenced an unknown or already-finished
    /// transaction.
    TransactionNotFound,

    /// A key byte fell outside the range this key kind can encode.
    KeyOutOfRange { reason: String },

    /// The trie could not satisfy the request for a structural reason
    /// (burst recursion exceeded max depth, allocation failure, corrupted
    /// bucket counters).
    Failure { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::KeyNotFound { index } => {
                write!(f, "key not found in index '{index}'")
            }
            StoreError::EntryExists { index } => {
                write!(f, "entry already exists in index '{index}'")
            }
            StoreError::DbEnd { index } => {
                write!(f, "scan exhausted on index '{index}'")
            }
            StoreError::Deadlock { index, timeout_ms } => {
                write!(
                    f,
                    "lock acquisition on index '{index}' timed out after {timeout_ms}ms"
                )
            }
            StoreError::IndexExists { name } => {
                write!(f, "index '{name}' already exists")
            }
            StoreError::IndexNotFound { name } => {
                write!(f, "index '{name}' does not exist")
            }
            StoreError::TransactionNotFound => {
                write!(f, "transaction does not exist")
            }
            StoreError::KeyOutOfRange { reason } => {
                write!(f, "key out of range: {reason}")
            }
            StoreError::Failure { reason } => {
                write!(f, "operation failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Result alias used throughout this crate.
pub type StoreResult<T> = Result<T, StoreError>;
