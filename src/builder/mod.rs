//! Builder API for ergonomic control block construction.
//!
//! [`ControlBlock::initialize`](crate::ControlBlock::initialize) takes the
//! routines directly and never fails. The builder is the validating front
//! door: it checks the configuration and that the required routines were
//! supplied before handing back an initialized block.

pub mod error;

pub use error::BuildError;

use crate::config::{FsmConfig, ReacquireStrategy};
use crate::core::{Action, Routine, StateRoutine};
use crate::engine::{ControlBlock, LocalFsm, SharedFsm};
use parking_lot::lock_api::RawMutex;

/// Builder for initialized control blocks with a fluent API.
///
/// # Example
///
/// ```
/// use tickfsm::builder::FsmBuilder;
/// use tickfsm::{Routine, Status};
///
/// let fsm = FsmBuilder::new()
///     .name("heater")
///     .entry_state(Routine::named("idle", || {}))
///     .no_entry_action()
///     .build_shared()
///     .unwrap();
///
/// assert_eq!(fsm.config().name, "heater");
/// assert_eq!(fsm.step(), Ok(Status::Running));
/// ```
#[derive(Debug, Default)]
pub struct FsmBuilder {
    config: FsmConfig,
    entry_state: Option<StateRoutine>,
    entry_action: Option<Action>,
    ending_action: Option<Action>,
}

impl FsmBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: FsmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn reacquire(mut self, strategy: ReacquireStrategy) -> Self {
        self.config.reacquire = strategy;
        self
    }

    pub fn trace_steps(mut self, enabled: bool) -> Self {
        self.config.trace_steps = enabled;
        self
    }

    /// Set the entry state (required).
    pub fn entry_state(mut self, routine: StateRoutine) -> Self {
        self.entry_state = Some(routine);
        self
    }

    /// Set the entry action (required).
    pub fn entry_action(mut self, routine: Action) -> Self {
        self.entry_action = Some(routine);
        self
    }

    /// Use the shared no-op as entry action.
    pub fn no_entry_action(self) -> Self {
        self.entry_action(Routine::noop())
    }

    /// Set the ending action. Defaults to the shared no-op.
    pub fn ending_action(mut self, routine: Action) -> Self {
        self.ending_action = Some(routine);
        self
    }

    /// Build and initialize a block guarded by `M`.
    /// Returns an error if the configuration is invalid or required routines
    /// are missing.
    pub fn build<M: RawMutex>(self) -> Result<ControlBlock<M>, BuildError> {
        self.config.validate()?;
        let entry_state = self.entry_state.ok_or(BuildError::MissingEntryState)?;
        let entry_action = self.entry_action.ok_or(BuildError::MissingEntryAction)?;
        let ending_action = self.ending_action.unwrap_or_else(Routine::noop);

        let block = ControlBlock::with_config(self.config);
        block.initialize(entry_state, entry_action, ending_action);
        Ok(block)
    }

    /// Build a block that may be shared between threads.
    pub fn build_shared(self) -> Result<SharedFsm, BuildError> {
        self.build()
    }

    /// Build a single-threaded block.
    pub fn build_local(self) -> Result<LocalFsm, BuildError> {
        self.build()
    }
}
