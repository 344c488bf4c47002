//! # MGLib
//!
//! Minigame rounds for game servers.
//!
//! A minigame registers on a [`Library`] with its settings and an arena
//! store. For each arena it creates at most one round, which cycles
//! through WAITING, PREPARING, PLAYING and ENDING driven by a
//! once-per-second timer. Players joining a round have their inventory,
//! game mode and position saved and restored on leave, even across a
//! disconnect. Block changes made while a round runs are logged and
//! undone when it ends, and again at startup if the server stopped
//! mid-round.
//!
//! The library owns no threads and no globals. The host routes its
//! events into the `on_*` methods of [`Library`] (see [`listener`]) and
//! calls [`Library::advance_tick`] twenty times a second, directly or
//! through the async [`driver`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mglib::prelude::*;
//!
//! # fn main() -> Result<(), MgError> {
//! let mut host = SimHost::new();
//! host.add_world("world");
//! let mut library = Library::new(host, NullSink, MemoryPlayerStore::new());
//!
//! let spawn = Location::new("world", 0.0, 64.0, 0.0);
//! let arenas = MemoryArenaStore::new().with_arena(
//!     "field",
//!     ArenaData {
//!         world: "world".into(),
//!         spawns: vec![spawn],
//!         bounds: None,
//!     },
//! );
//! let spleef = library.register(
//!     "spleef",
//!     MinigameConfig::default(),
//!     Box::new(arenas),
//!     Box::new(MemoryRollbackStore::new()),
//! )?;
//! spleef.create_round("field")?;
//! # Ok(())
//! # }
//! ```

pub mod driver;
mod error;
mod library;
pub mod listener;
mod logging;

pub use error::MgError;
pub use library::Library;
pub use listener::Decision;
pub use logging::init_logging;

/// Re-exports of the types most embedders touch.
pub mod prelude {
    pub use crate::driver::{SharedLibrary, share};
    pub use crate::{Decision, Library, MgError, init_logging};
    pub use mglib_host::{
        ChannelSink, EventLog, EventSink, Host, HostError, NullSink, SimHost,
    };
    pub use mglib_player::{
        JsonPlayerStore, MemoryPlayerStore, MgPlayer, Participant, ParticipantFactory,
        ParticipantState, PlayerStore,
    };
    pub use mglib_rollback::{JsonRollbackStore, MemoryRollbackStore, RollbackStore};
    pub use mglib_round::{
        ArenaData, ArenaStore, BlockAction, BlockRules, Env, JsonArenaStore, MemoryArenaStore,
        Minigame, MinigameConfig, Round, RoundError, SpawnPolicy, Stage,
    };
    pub use mglib_tick::{TICKS_PER_SECOND, TickConfig, TickPolicy};
    pub use mglib_types::{
        BlockPos, BlockState, Bounds, GameMode, Inventory, ItemStack, Location, PlayerId,
        RoundEvent, RoundKey,
    };
}
