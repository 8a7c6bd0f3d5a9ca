//! Mutual-exclusion adapters.
//!
//! The guard around a control block is any [`RawMutex`] from `lock_api`: a
//! lock/try-lock/unlock capability. Concurrent blocks use
//! `parking_lot::RawMutex`; callers may plug in any other implementation.
//! Single-threaded blocks use [`NoopMutex`].

use parking_lot::lock_api::{GuardNoSend, RawMutex};
use std::cell::Cell;

/// Guard for single-threaded control blocks.
///
/// Performs no synchronization: in every path the engine takes, lock and
/// unlock succeed immediately. It only remembers whether it is held, which
/// keeps `lock_api`'s one-guard-at-a-time contract intact. The `Cell` makes
/// it `!Sync`, so a block using it cannot be shared between threads.
#[derive(Debug)]
pub struct NoopMutex {
    held: Cell<bool>,
}

unsafe impl RawMutex for NoopMutex {
    const INIT: Self = NoopMutex {
        held: Cell::new(false),
    };

    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        while !self.try_lock() {
            std::hint::spin_loop();
        }
    }

    fn try_lock(&self) -> bool {
        !self.held.replace(true)
    }

    unsafe fn unlock(&self) {
        self.held.set(false);
    }
}
