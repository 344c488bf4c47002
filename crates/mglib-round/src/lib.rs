//! Round lifecycle management for MGLib.
//!
//! A minigame owns any number of rounds, one per arena. Each round
//! moves through a small state machine driven by a once-per-second
//! timer:
//!
//! ```text
//! Waiting ──start──→ Preparing ──time up──→ Playing ──time up / end──→ Waiting
//!    └───────────start (no preparation)──────↗
//! ```
//!
//! # Key types
//!
//! - [`Minigame`]: one owner's rounds, arenas and rollback logs.
//! - [`Round`]: the state machine, its roster and its settings.
//! - [`Stage`]: lifecycle stage.
//! - [`MinigameConfig`]: defaults rounds are created with.
//! - [`ArenaStore`]: where arena templates live.
//! - [`Env`]: the host, scheduler, event sink and player store a side
//!   effecting operation needs.

mod arena;
mod config;
mod env;
mod error;
mod minigame;
mod round;

pub use arena::{ArenaData, ArenaStore, JsonArenaStore, MemoryArenaStore};
pub use config::{BlockAction, BlockRules, MinigameConfig, SpawnPolicy, Stage};
pub use env::Env;
pub use error::RoundError;
pub use minigame::Minigame;
pub use round::Round;
