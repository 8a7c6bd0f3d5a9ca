//! Tickfsm: a minimal cooperative finite-state-machine engine
//!
//! Tickfsm is built for embedding in control loops. A caller-owned
//! [`ControlBlock`] holds one machine instance; an external scheduler polls
//! [`ControlBlock::step`] once per tick, and any thread (including the running
//! state routine) may request a transition or termination at any time.
//!
//! # Core Concepts
//!
//! - **Routines**: opaque zero-argument callables acting as state bodies or
//!   one-shot actions
//! - **Phases**: the engine's internal meta-state (`Start`, `Transition`,
//!   `NoChange`, `End`), distinct from application states
//! - **Guards**: a pluggable `lock_api` mutex around the block; a no-op guard
//!   serves single-threaded use
//!
//! # Example
//!
//! ```rust
//! use tickfsm::{LocalFsm, Routine, Status};
//!
//! let red = Routine::named("red", || {});
//! let green = Routine::named("green", || {});
//!
//! let fsm = LocalFsm::single_threaded(red.clone(), Routine::noop(), Routine::noop());
//! assert_eq!(fsm.step(), Ok(Status::Running));
//!
//! fsm.request_transition(green.clone(), Routine::noop());
//! fsm.step().unwrap();
//! assert_eq!(fsm.current_state(), Some(green));
//! assert_eq!(fsm.previous_state(), Some(red));
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod snapshot;

// Re-export commonly used types
pub use crate::config::{FsmConfig, ReacquireStrategy};
pub use crate::core::{no_action, Action, Invoke, NoopMutex, Phase, Routine, StateRoutine, Status};
pub use crate::engine::{ControlBlock, LocalFsm, SharedFsm, StepError, StepStats};
pub use crate::snapshot::{Snapshot, SnapshotError};
