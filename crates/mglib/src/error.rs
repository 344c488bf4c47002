//! Unified error type for MGLib.

use mglib_host::HostError;
use mglib_player::StoreError;
use mglib_rollback::RollbackError;
use mglib_round::RoundError;
use mglib_types::CodecError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors, so code
/// using the `mglib` crate only deals with this one type.
#[derive(Debug, thiserror::Error)]
pub enum MgError {
    /// A minigame with this owner name is already registered.
    #[error("minigame {0} is already registered")]
    MinigameExists(String),

    #[error("no minigame registered as {0}")]
    MinigameNotFound(String),

    /// Round or arena operation failed (full, not present, bad state...).
    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    /// Player snapshot or pending-restore persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
