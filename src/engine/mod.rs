//! The execution engine.
//!
//! A [`ControlBlock`] is one running state machine instance. The caller
//! initializes it once, then polls [`ControlBlock::step`] from a single engine
//! thread. Any thread, including the running state routine itself, may call
//! [`ControlBlock::request_transition`] or [`ControlBlock::request_end`] at any
//! time; the request is honored by the next step.
//!
//! # Phases
//!
//! Each step advances exactly one meta-transition:
//!
//! | Phase on entry | Work                                         | Returns   |
//! |----------------|----------------------------------------------|-----------|
//! | `Start`        | run the entry action                         | `Running` |
//! | `NoChange`     | run the current state with the guard released | `Running` |
//! | `Transition`   | shift `next` into `current`, run the action  | `Running` |
//! | `End`          | reset all state references to the entry state, run the ending action | `Ended` |
//!
//! Every phase leaves the block in `NoChange`. The guard is never held while a
//! routine runs, so routines may call the requestors without deadlocking.
//!
//! # Variants
//!
//! - [`SharedFsm`] is guarded by `parking_lot::RawMutex` and may be shared
//!   between threads. Termination always runs the ending action fixed at
//!   initialization.
//! - [`LocalFsm`] uses [`NoopMutex`](crate::core::NoopMutex), is `!Sync`, and
//!   additionally accepts a per-request ending action through
//!   [`ControlBlock::request_end_with`].

mod block;
mod error;
mod request;
mod step;

pub use block::{ControlBlock, LocalFsm, SharedFsm, StepStats};
pub use error::StepError;
