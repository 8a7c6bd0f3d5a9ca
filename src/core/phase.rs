//! Execution phases and step outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal execution stage of the meta-state-machine.
///
/// Phases are distinct from the application-level states the routines
/// represent. They are never set by callers: the engine and the two
/// requestors are the only writers.
///
/// The control block stores the phase as its raw code and decodes it on every
/// step, so a code outside this enum surfaces as
/// [`StepError::UnknownPhase`](crate::StepError::UnknownPhase) instead of
/// being silently reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Phase {
    /// Initialized, entry action not yet run
    Start = 0,
    /// A transition request is waiting for the next step
    Transition = 1,
    /// Steady state: the current state routine runs on every step
    NoChange = 2,
    /// A termination request is waiting for the next step
    End = 3,
}

impl Phase {
    /// Raw code stored in the control block.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Check if a request is waiting to be consumed by the next step.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Transition | Self::End)
    }
}

impl TryFrom<u8> for Phase {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Phase::Start),
            1 => Ok(Phase::Transition),
            2 => Ok(Phase::NoChange),
            3 => Ok(Phase::End),
            other => Err(other),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Transition => write!(f, "transition"),
            Self::NoChange => write!(f, "no_change"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Successful outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The machine is still running
    Running,
    /// The step consumed a termination request
    Ended,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Ended => write!(f, "ended"),
        }
    }
}
