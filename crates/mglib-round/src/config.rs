//! Minigame configuration and the round stage machine.

use std::fs;
use std::path::Path;

use mglib_player::StoreError;
use mglib_types::{Codec, GameMode, JsonCodec, Location};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// MinigameConfig
// ---------------------------------------------------------------------------

/// Per-minigame settings. Every round created by the minigame starts
/// from these and may override them afterwards.
///
/// All fields have defaults, so a config file only needs the keys it
/// wants to change:
///
/// ```json
/// { "playing_time": 120, "min_players": 2, "rollback": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinigameConfig {
    /// Seconds spent in [`Stage::Preparing`]. 0 skips the stage.
    pub preparation_time: u32,

    /// Seconds spent in [`Stage::Playing`]. 0 means no time limit.
    pub playing_time: u32,

    /// Joins needed to start a waiting round automatically. 0 disables
    /// auto-start.
    pub min_players: usize,

    /// Roster capacity. 0 means unlimited.
    pub max_players: usize,

    /// Where players go when they leave a round and no other exit was
    /// given.
    pub default_exit: Option<Location>,

    pub pvp: bool,
    pub damage: bool,

    /// Log world changes during rounds and undo them at round end.
    pub rollback: bool,

    /// How a spawn is chosen when the caller does not name one.
    pub spawn_policy: SpawnPolicy,

    pub allow_join_while_preparing: bool,
    pub allow_join_in_progress: bool,

    /// Players joining a round that is preparing or playing become
    /// spectators.
    pub spectate_on_join: bool,

    /// Game mode given to players on join.
    pub default_game_mode: GameMode,

    pub blocks: BlockRules,
}

impl Default for MinigameConfig {
    fn default() -> Self {
        Self {
            preparation_time: 60,
            playing_time: 300,
            min_players: 0,
            max_players: 32,
            default_exit: None,
            pvp: true,
            damage: true,
            rollback: false,
            spawn_policy: SpawnPolicy::default(),
            allow_join_while_preparing: true,
            allow_join_in_progress: false,
            spectate_on_join: true,
            default_game_mode: GameMode::Adventure,
            blocks: BlockRules::default(),
        }
    }
}

impl MinigameConfig {
    /// Reads a config from a JSON file. Missing keys take their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let bytes = fs::read(path)?;
        let config: Self = JsonCodec.decode(&bytes)?;
        Ok(config.validated())
    }

    /// Fixes contradictory limits.
    pub fn validated(mut self) -> Self {
        if self.max_players > 0 && self.min_players > self.max_players {
            warn!(
                min = self.min_players,
                max = self.max_players,
                "min_players exceeds max_players, lowering it"
            );
            self.min_players = self.max_players;
        }
        self
    }
}

/// Spawn selection when a join does not name a valid spawn index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPolicy {
    /// Uniformly random spawn.
    #[default]
    Random,
    /// Round-robin: spawn `roster size % spawn count`, with the roster
    /// size taken before the joining player is added.
    Sequential,
}

// ---------------------------------------------------------------------------
// BlockRules
// ---------------------------------------------------------------------------

/// Block mutations a minigame's arenas allow.
///
/// `place` and `break` apply to participants in running rounds. The
/// rest are environmental changes and apply to every world hosting one
/// of the minigame's arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRules {
    pub place: bool,
    #[serde(rename = "break")]
    pub break_: bool,
    pub burn: bool,
    pub fade: bool,
    pub grow: bool,
    pub ignite: bool,
    pub flow: bool,
    pub physics: bool,
    pub piston: bool,
    pub spread: bool,
}

impl Default for BlockRules {
    fn default() -> Self {
        Self {
            place: true,
            break_: true,
            burn: false,
            fade: false,
            grow: false,
            ignite: false,
            flow: false,
            physics: false,
            piston: false,
            spread: false,
        }
    }
}

/// A kind of block mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockAction {
    Place,
    Break,
    Burn,
    Fade,
    Grow,
    Ignite,
    Flow,
    Physics,
    Piston,
    Spread,
}

impl BlockRules {
    pub fn allows(&self, action: BlockAction) -> bool {
        match action {
            BlockAction::Place => self.place,
            BlockAction::Break => self.break_,
            BlockAction::Burn => self.burn,
            BlockAction::Fade => self.fade,
            BlockAction::Grow => self.grow,
            BlockAction::Ignite => self.ignite,
            BlockAction::Flow => self.flow,
            BlockAction::Physics => self.physics,
            BlockAction::Piston => self.piston,
            BlockAction::Spread => self.spread,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The lifecycle stage of a round.
///
/// ```text
/// Waiting → [Preparing →] Playing → Ending → Waiting
/// ```
///
/// - **Waiting**: idle, accepting joins toward the minimum.
/// - **Preparing**: countdown before play. Skipped when the preparation
///   time is 0.
/// - **Playing**: the timer counts toward the playing time, or runs
///   unbounded when it is 0.
/// - **Ending**: transient, only observable while `end()` is tearing
///   the round down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Waiting,
    Preparing,
    Playing,
    Ending,
}

impl Stage {
    /// `true` while the round timer is running.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Preparing | Self::Playing)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Preparing => write!(f, "PREPARING"),
            Self::Playing => write!(f, "PLAYING"),
            Self::Ending => write!(f, "ENDING"),
        }
    }
}
