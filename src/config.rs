//! Control block configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest instance name accepted by [`FsmConfig::validate`].
pub const MAX_NAME_LEN: usize = 64;

/// How a contended guard is retried.
///
/// Used by the engine when it re-acquires the guard after a state routine
/// returns, and by the requestors. Both strategies back off exponentially;
/// they differ in what happens once spinning stops paying off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReacquireStrategy {
    /// Busy-wait only. Suited to cores dedicated to the machine.
    Spin,
    /// Spin briefly, then yield the thread to the scheduler.
    #[default]
    Snooze,
}

/// Errors reported by [`FsmConfig::validate`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Instance name must not be empty")]
    EmptyName,

    #[error("Instance name is {len} bytes, limit is {max}")]
    NameTooLong { len: usize, max: usize },
}

/// Settings fixed when a control block is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmConfig {
    /// Instance label used in log events and snapshots
    pub name: String,

    /// Retry strategy for a contended guard
    pub reacquire: ReacquireStrategy,

    /// Emit a `trace` event for every steady-state step
    pub trace_steps: bool,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            name: "fsm".to_string(),
            reacquire: ReacquireStrategy::default(),
            trace_steps: true,
        }
    }
}

impl FsmConfig {
    /// Configuration with the given name and default settings otherwise.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(ConfigError::NameTooLong {
                len: self.name.len(),
                max: MAX_NAME_LEN,
            });
        }
        Ok(())
    }
}
