//! Step failure taxonomy.

use thiserror::Error;

/// Failures reported by [`ControlBlock::step`](crate::ControlBlock::step).
///
/// None of these are raised as panics. `NotInitialized` and `MutexLocked` are
/// recoverable by retrying; `UnknownPhase` means the control block no longer
/// holds a valid phase and is left exactly as found.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("Control block is not initialized")]
    NotInitialized,

    #[error("Control block guard is held elsewhere, retry the step later")]
    MutexLocked,

    #[error("Control block holds unknown phase code {code}")]
    UnknownPhase { code: u8 },
}

impl StepError {
    /// Check if retrying the same call later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::MutexLocked)
    }
}
