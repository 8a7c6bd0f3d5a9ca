//! Control block storage and lifecycle.

use crate::config::{FsmConfig, ReacquireStrategy};
use crate::core::{Action, NoopMutex, Phase, StateRoutine};
use crate::engine::error::StepError;
use crossbeam::utils::Backoff;
use parking_lot::lock_api::{Mutex, MutexGuard, RawMutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Control block that may be shared between an engine thread and producers.
pub type SharedFsm = ControlBlock<parking_lot::RawMutex>;

/// Control block for single-threaded use.
pub type LocalFsm = ControlBlock<NoopMutex>;

/// Counters maintained by the engine since the last initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    /// Steps that completed with `Running` or `Ended`
    pub steps: u64,
    /// Transitions consumed
    pub transitions: u64,
    /// Terminations consumed
    pub terminations: u64,
    /// Steps refused because the guard was held elsewhere
    pub contended: u64,
}

/// The routines wired into an initialized block.
pub(crate) struct Wiring {
    pub(crate) entry_state: StateRoutine,
    pub(crate) entry_action: Action,
    pub(crate) ending_action: Action,
    pub(crate) previous: StateRoutine,
    pub(crate) current: StateRoutine,
    pub(crate) next: StateRoutine,
    pub(crate) pending_action: Action,
}

impl Wiring {
    fn new(entry_state: StateRoutine, entry_action: Action, ending_action: Action) -> Self {
        Self {
            previous: entry_state.clone(),
            current: entry_state.clone(),
            next: entry_state.clone(),
            pending_action: entry_action.clone(),
            entry_state,
            entry_action,
            ending_action,
        }
    }

    /// Move the pending target into `current`, returning the action to run.
    pub(crate) fn swap_in_next(&mut self) -> Action {
        self.previous = std::mem::replace(&mut self.current, self.next.clone());
        self.pending_action.clone()
    }

    /// Point every state reference back at the entry state, returning the
    /// ending action to run.
    pub(crate) fn rewind(&mut self) -> Action {
        self.previous = self.entry_state.clone();
        self.current = self.entry_state.clone();
        self.next = self.entry_state.clone();
        self.pending_action.clone()
    }
}

/// Everything guarded by the block's mutex.
pub(crate) struct Slots {
    pub(crate) wiring: Option<Wiring>,
    pub(crate) phase: u8,
    pub(crate) stats: StepStats,
}

impl Slots {
    const EMPTY: Slots = Slots {
        wiring: None,
        phase: Phase::Start.code(),
        stats: StepStats {
            steps: 0,
            transitions: 0,
            terminations: 0,
            contended: 0,
        },
    };
}

/// One state machine instance.
///
/// The block is plain caller-owned data: put it on the stack, in a static
/// cell, or behind an `Arc` when producers on other threads need it. Stepping
/// never allocates; routines are shared handles that are only cloned.
///
/// # Example
///
/// ```rust
/// use tickfsm::{LocalFsm, Routine, Status};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// let incr = {
///     let counter = Arc::clone(&counter);
///     Routine::named("incr", move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
/// };
///
/// let idle = Routine::named("idle", || {});
/// let busy = Routine::named("busy", || {});
/// let fsm = LocalFsm::single_threaded(idle.clone(), incr.clone(), Routine::noop());
///
/// assert_eq!(fsm.step(), Ok(Status::Running));
/// assert_eq!(counter.load(Ordering::SeqCst), 1);
///
/// fsm.request_transition(busy.clone(), incr);
/// assert_eq!(fsm.step(), Ok(Status::Running));
/// assert_eq!(fsm.current_state(), Some(busy));
///
/// fsm.request_end();
/// assert_eq!(fsm.step(), Ok(Status::Ended));
/// assert_eq!(fsm.current_state(), Some(idle));
/// ```
pub struct ControlBlock<M: RawMutex = parking_lot::RawMutex> {
    id: Uuid,
    config: FsmConfig,
    initialized: AtomicBool,
    contended: AtomicU64,
    slots: Mutex<M, Slots>,
}

impl<M: RawMutex> ControlBlock<M> {
    /// Create an uninitialized block with the default configuration.
    pub fn new() -> Self {
        Self::with_config(FsmConfig::default())
    }

    /// Create an uninitialized block.
    pub fn with_config(config: FsmConfig) -> Self {
        Self::with_mutex(M::INIT, config)
    }

    /// Create an uninitialized block guarded by the supplied mutex.
    pub fn with_mutex(mutex: M, config: FsmConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            initialized: AtomicBool::new(false),
            contended: AtomicU64::new(0),
            slots: Mutex::from_raw(mutex, Slots::EMPTY),
        }
    }

    /// Wire the routines in and reset the block to `Start`.
    ///
    /// `previous`, `current`, and `next` all become `entry_state`; the first
    /// step runs `entry_action`. Calling this on an initialized block restarts
    /// it from scratch and clears its counters.
    pub fn initialize(&self, entry_state: StateRoutine, entry_action: Action, ending_action: Action) {
        let mut slots = self.acquire();
        debug!(
            fsm = %self.config.name,
            id = %self.id,
            entry_state = entry_state.name(),
            entry_action = entry_action.name(),
            ending_action = ending_action.name(),
            reinitialized = slots.wiring.is_some(),
            "Control block initialized"
        );
        slots.wiring = Some(Wiring::new(entry_state, entry_action, ending_action));
        slots.phase = Phase::Start.code();
        slots.stats = StepStats::default();
        self.contended.store(0, Ordering::Relaxed);
        self.initialized.store(true, Ordering::Release);
    }

    /// Unique identifier of this instance, used in logs and snapshots.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &FsmConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Current phase of the meta-state-machine.
    pub fn phase(&self) -> Result<Phase, StepError> {
        if !self.is_initialized() {
            return Err(StepError::NotInitialized);
        }
        let code = self.acquire().phase;
        Phase::try_from(code).map_err(|code| StepError::UnknownPhase { code })
    }

    /// The routine run on every steady-state step.
    pub fn current_state(&self) -> Option<StateRoutine> {
        self.read_wiring(|wiring| wiring.current.clone())
    }

    pub fn previous_state(&self) -> Option<StateRoutine> {
        self.read_wiring(|wiring| wiring.previous.clone())
    }

    /// The pending transition target, or the current state when none is pending.
    pub fn next_state(&self) -> Option<StateRoutine> {
        self.read_wiring(|wiring| wiring.next.clone())
    }

    pub fn entry_state(&self) -> Option<StateRoutine> {
        self.read_wiring(|wiring| wiring.entry_state.clone())
    }

    pub fn stats(&self) -> StepStats {
        let mut stats = self.acquire().stats;
        stats.contended = self.contention_count();
        stats
    }

    fn read_wiring<T>(&self, read: impl FnOnce(&Wiring) -> T) -> Option<T> {
        self.acquire().wiring.as_ref().map(read)
    }

    /// Take the guard, retrying with the configured backoff until it is free.
    ///
    /// The guard is only ever held for a handful of field writes, so the wait
    /// is bounded by other threads' bookkeeping, never by routine bodies.
    pub(crate) fn acquire(&self) -> MutexGuard<'_, M, Slots> {
        let backoff = Backoff::new();
        loop {
            if let Some(slots) = self.slots.try_lock() {
                return slots;
            }
            self.back_off(&backoff);
        }
    }

    /// Take the guard only if it is free right now.
    pub(crate) fn try_acquire(&self) -> Option<MutexGuard<'_, M, Slots>> {
        self.slots.try_lock()
    }

    pub(crate) fn back_off(&self, backoff: &Backoff) {
        match self.config.reacquire {
            ReacquireStrategy::Spin => backoff.spin(),
            ReacquireStrategy::Snooze => backoff.snooze(),
        }
    }

    pub(crate) fn contention_count(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }

    pub(crate) fn note_contention(&self) -> u64 {
        self.contended.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl ControlBlock<NoopMutex> {
    /// Create a single-threaded block and initialize it.
    pub fn single_threaded(
        entry_state: StateRoutine,
        entry_action: Action,
        ending_action: Action,
    ) -> Self {
        let block = Self::new();
        block.initialize_single_threaded(entry_state, entry_action, ending_action);
        block
    }

    /// Initialize with the no-op guard installed at construction.
    pub fn initialize_single_threaded(
        &self,
        entry_state: StateRoutine,
        entry_action: Action,
        ending_action: Action,
    ) {
        self.initialize(entry_state, entry_action, ending_action);
    }
}

impl<M: RawMutex> Default for ControlBlock<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> fmt::Debug for ControlBlock<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBlock")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl<M: RawMutex> ControlBlock<M> {
    /// Overwrite the stored phase code, bypassing the engine.
    pub(crate) fn force_phase_code(&self, code: u8) {
        self.acquire().phase = code;
    }
}
