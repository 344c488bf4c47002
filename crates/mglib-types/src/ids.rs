//! Identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a player.
///
/// Display names can change between sessions, so everything that
/// outlives a connection (inventory snapshots, pending restores, roster
/// keys) is keyed by this id instead. Resolving a display name to an id
/// is the host's job.
///
/// `#[serde(transparent)]` stores it as a bare number, so a snapshot
/// file for player 42 is simply named `42.json`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identity of a round: the owning minigame plus the arena it runs in.
///
/// One owner can run at most one round per arena, so this pair is
/// unique across the whole process.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundKey {
    /// Name of the minigame that registered the round.
    pub owner: String,
    /// Name of the arena the round is bound to.
    pub arena: String,
}

impl RoundKey {
    pub fn new(owner: impl Into<String>, arena: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            arena: arena.into(),
        }
    }
}

impl fmt::Display for RoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.arena)
    }
}
