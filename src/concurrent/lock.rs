// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! In-process reader/writer lock coordination for one index.
//!
//! Bookkeeping lives entirely in [`LockState`] behind a plain
//! [`std::sync::Mutex`]; this is a protocol, not a RAII guard — callers
//! hold a read or write "grant" across an arbitrary sequence of calls (a
//! whole transaction's lifetime), which a borrowed [`std::sync::RwLock`]
//! guard cannot do without a self-referential struct. Acquisition polls
//! with a ~80ms deadline, the sole deadlock-detection mechanism this
//! layer has.

use crate::error::{StoreError, StoreResult};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Deadline for a single lock acquisition attempt.
pub const LOCK_TIMEOUT: Duration = Duration::from_nanos(80_000_000);

#[derive(Debug, Default)]
struct LockState {
    readers: u32,
    writer: bool,
}

/// Reader/writer lock for one index, with deadline-bounded acquisition
/// and a non-atomic read-to-write upgrade.
#[derive(Debug)]
pub struct IndexLock {
    name: String,
    state: Mutex<LockState>,
    changed: Condvar,
}

impl IndexLock {
    pub fn new(name: impl Into<String>) -> Self {
        IndexLock {
            name: name.into(),
            state: Mutex::new(LockState::default()),
            changed: Condvar::new(),
        }
    }

    fn timed_out(&self) -> StoreError {
        StoreError::Deadlock {
            index: self.name.clone(),
            timeout_ms: LOCK_TIMEOUT.as_millis() as u64,
        }
    }

    /// Block until a shared read grant is available or `LOCK_TIMEOUT`
    /// elapses.
    pub fn acquire_read(&self) -> StoreResult<()> {
        let deadline = Instant::now() + LOCK_TIMEOUT;
        let mut state = self.state.lock().unwrap();
        loop {
            if !state.writer {
                state.readers += 1;
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out());
            }
            let (guard, timeout) = self.changed.wait_timeout(state, remaining).unwrap();
            state = guard;
            if timeout.timed_out() && state.writer {
                return Err(self.timed_out());
            }
        }
    }

    pub fn release_read(&self) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.readers > 0);
        state.readers -= 1;
        self.changed.notify_all();
    }

    /// Block until an exclusive write grant is available or
    /// `LOCK_TIMEOUT` elapses.
    pub fn acquire_write(&self) -> StoreResult<()> {
        let deadline = Instant::now() + LOCK_TIMEOUT;
        let mut state = self.state.lock().unwrap();
        loop {
            if !state.writer && state.readers == 0 {
                state.writer = true;
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out());
            }
            let (guard, timeout) = self.changed.wait_timeout(state, remaining).unwrap();
            state = guard;
            if timeout.timed_out() && (state.writer || state.readers > 0) {
                return Err(self.timed_out());
            }
        }
    }

    pub fn release_write(&self) {
        let mut state = self.state.lock().unwrap();
        debug_assert!(state.writer);
        state.writer = false;
        self.changed.notify_all();
    }

    /// Upgrade a held read grant to a write grant. Releases the read
    /// side unconditionally, then attempts a single non-blocking write
    /// acquisition — on failure the read side is **not** reacquired, a
    /// documented, deliberately preserved limitation (see `DESIGN.md`).
    /// The caller must abort its transaction on `Err`.
    pub fn upgrade(&self) -> StoreResult<()> {
        self.release_read();
        let mut state = self.state.lock().unwrap();
        if !state.writer && state.readers == 0 {
            state.writer = true;
            Ok(())
        } else {
            Err(self.timed_out())
        }
    }
}
