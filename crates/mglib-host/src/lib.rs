//! Host abstraction layer for MGLib.
//!
//! MGLib never runs on its own. It lives inside a game server process
//! and reaches the world, the players and the event bus through the
//! traits defined here:
//!
//! - [`Host`]: presence, actor control (teleport, inventory, game mode,
//!   messaging) and world cell/container mutation.
//! - [`EventSink`]: where [`RoundEvent`] notifications go.
//!
//! # Feature Flags
//!
//! - `sim` (default): [`SimHost`], an in-memory host used by tests,
//!   demos and anyone embedding the round engine outside a real server.

mod error;
mod sink;
#[cfg(feature = "sim")]
mod sim;

pub use error::HostError;
pub use sink::{ChannelSink, EventLog, EventSink, NullSink};
#[cfg(feature = "sim")]
pub use sim::{SimHost, SimPlayer};

use mglib_types::{BlockPos, BlockState, GameMode, Inventory, Location, PlayerId};

/// Everything the core needs from the game server.
///
/// All methods are synchronous: the host delivers events and timer
/// callbacks on its own tick thread and expects them to run to
/// completion. Methods that act on a player fail with
/// [`HostError::PlayerOffline`] when the player has no live connection.
pub trait Host: Send + 'static {
    // -- presence ----------------------------------------------------------

    /// Returns `true` if the player currently has a live connection.
    fn is_online(&self, player: PlayerId) -> bool;

    /// Current display name of a known player.
    fn player_name(&self, player: PlayerId) -> Option<String>;

    /// Resolves a display name to a stable id.
    fn resolve_name(&self, name: &str) -> Option<PlayerId>;

    // -- actors ------------------------------------------------------------

    fn location(&self, player: PlayerId) -> Result<Location, HostError>;

    fn teleport(&mut self, player: PlayerId, to: &Location) -> Result<(), HostError>;

    fn inventory(&self, player: PlayerId) -> Result<Inventory, HostError>;

    fn set_inventory(&mut self, player: PlayerId, inventory: Inventory) -> Result<(), HostError>;

    fn game_mode(&self, player: PlayerId) -> Result<GameMode, HostError>;

    fn set_game_mode(&mut self, player: PlayerId, mode: GameMode) -> Result<(), HostError>;

    /// Removes every active status effect from the player.
    fn clear_effects(&mut self, player: PlayerId) -> Result<(), HostError>;

    fn send_message(&mut self, player: PlayerId, message: &str) -> Result<(), HostError>;

    // -- world -------------------------------------------------------------

    fn world_exists(&self, world: &str) -> bool;

    fn block(&self, world: &str, pos: BlockPos) -> Result<BlockState, HostError>;

    fn set_block(&mut self, world: &str, pos: BlockPos, state: &BlockState)
    -> Result<(), HostError>;

    /// Contents of the container block at `pos`.
    fn container(&self, world: &str, pos: BlockPos) -> Result<Inventory, HostError>;

    fn set_container(
        &mut self,
        world: &str,
        pos: BlockPos,
        inventory: &Inventory,
    ) -> Result<(), HostError>;
}
