// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Locking and coordination for concurrent index access.

pub mod lock;

pub use lock::{IndexLock, LOCK_TIMEOUT};
