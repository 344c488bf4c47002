use mglib_types::{BlockPos, PlayerId};

/// Errors reported by a [`Host`](crate::Host) implementation.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The player has no live connection.
    #[error("player {0} is offline")]
    PlayerOffline(PlayerId),

    /// The host has never seen this player.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// The world isn't loaded.
    #[error("world {0} is not loaded")]
    UnknownWorld(String),

    /// There is no container block at the given cell.
    #[error("no container at {world} {pos:?}")]
    NoContainer { world: String, pos: BlockPos },

    /// The host refused the operation (e.g. another plugin cancelled
    /// the teleport).
    #[error("host rejected operation: {0}")]
    Rejected(String),
}
