//! Core building blocks shared by every control block.
//!
//! This module contains the small, dependency-free pieces the engine is
//! assembled from:
//! - Routines: the opaque state and action callables
//! - Phases: the internal stages of the meta-state-machine
//! - Mutex adapters: the pluggable guard around a control block

mod mutex;
mod phase;
mod routine;

pub use mutex::NoopMutex;
pub use phase::{Phase, Status};
pub use routine::{no_action, Action, Invoke, Routine, StateRoutine, ANONYMOUS};
