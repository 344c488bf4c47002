//! Notifications the core emits about rounds and their players.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoundKey};

/// A typed, fire-and-forget notification.
///
/// Rounds push these into an event sink (see `mglib-host`) as things
/// happen. Delivery is synchronous and there is no reply: listeners such
/// as lobby displays or the host's own event bus observe, they don't veto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// The round left WAITING and entered its preparation countdown.
    RoundPreparing { round: RoundKey },

    /// The round entered PLAYING.
    RoundStarted { round: RoundKey },

    /// One timer tick was processed.
    RoundTicked {
        round: RoundKey,
        /// Elapsed seconds before this tick.
        old_elapsed: i64,
        /// Whether the tick moved the round to another stage.
        stage_changed: bool,
    },

    /// The round ended and every participant was released.
    RoundEnded { round: RoundKey, timed_out: bool },

    /// The arena's change log was replayed and cleared.
    RoundRolledBack {
        round: RoundKey,
        /// Number of change records undone.
        records: usize,
    },

    /// A player was added to the round's roster.
    PlayerJoined { round: RoundKey, player: PlayerId },

    /// A player was removed from the round's roster.
    PlayerLeft { round: RoundKey, player: PlayerId },

    /// A player was pulled back inside the arena bounds.
    PlayerHitBorder { round: RoundKey, player: PlayerId },
}

impl RoundEvent {
    /// The round this notification is about.
    pub fn round(&self) -> &RoundKey {
        match self {
            Self::RoundPreparing { round }
            | Self::RoundStarted { round }
            | Self::RoundTicked { round, .. }
            | Self::RoundEnded { round, .. }
            | Self::RoundRolledBack { round, .. }
            | Self::PlayerJoined { round, .. }
            | Self::PlayerLeft { round, .. }
            | Self::PlayerHitBorder { round, .. } => round,
        }
    }

    /// The player this notification is about, if any.
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::PlayerJoined { player, .. }
            | Self::PlayerLeft { player, .. }
            | Self::PlayerHitBorder { player, .. } => Some(*player),
            _ => None,
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_type() {
        let ev = RoundEvent::RoundEnded {
            round: RoundKey::new("spleef", "a1"),
            timed_out: true,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "round_ended");
        assert_eq!(json["timed_out"], true);
        assert_eq!(json["round"]["arena"], "a1");
    }

    #[test]
    fn test_player_accessor() {
        let key = RoundKey::new("o", "a");
        let joined = RoundEvent::PlayerJoined {
            round: key.clone(),
            player: PlayerId(3),
        };
        assert_eq!(joined.player(), Some(PlayerId(3)));
        assert_eq!(joined.round(), &key);
        assert_eq!(RoundEvent::RoundStarted { round: key }.player(), None);
    }
}
