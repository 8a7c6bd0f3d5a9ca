//! Build errors for control block builders.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur when building a control block.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Entry state not specified. Call .entry_state(routine) before .build()")]
    MissingEntryState,

    #[error("Entry action not specified. Call .entry_action(routine) or .no_entry_action()")]
    MissingEntryAction,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
