//! Error types for the round layer.

use mglib_host::HostError;
use mglib_player::StoreError;
use mglib_rollback::RollbackError;
use mglib_types::PlayerId;

/// Errors that can occur during round and arena operations.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    /// The player has no live connection.
    #[error("player {0} is offline")]
    PlayerOffline(PlayerId),

    /// The player is already in a round, this one or another.
    #[error("player {player} is already in the round on {arena}")]
    AlreadyInRound { player: PlayerId, arena: String },

    /// The player is not in the round.
    #[error("player {0} is not in a round")]
    NotPresent(PlayerId),

    #[error("round on {0} is full")]
    RoundFull(String),

    #[error("arena {0} not found")]
    ArenaNotFound(String),

    #[error("arena {0} already exists")]
    ArenaExists(String),

    /// Geometry that spans worlds, or a world the host does not know.
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// The round's stage does not allow the operation, e.g. starting a
    /// round that is already running.
    #[error("invalid round state: {0}")]
    InvalidState(String),

    #[error("no round on arena {0}")]
    RoundNotFound(String),

    /// A snapshot or pending restore could not be persisted. The
    /// operation was aborted without touching the roster.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    Host(#[from] HostError),
}
