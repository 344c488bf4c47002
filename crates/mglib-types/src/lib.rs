//! Shared vocabulary for MGLib.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - **Identity** ([`PlayerId`], [`RoundKey`]): who a player is and
//!   which round (owner + arena) something belongs to.
//! - **Geometry** ([`Location`], [`BlockPos`], [`Bounds`]): where
//!   actors stand, which cell of the world changed, and the box a
//!   round keeps its players inside.
//! - **Inventory** ([`Inventory`], [`ItemStack`], [`GameMode`],
//!   [`BlockState`]): the host state that is snapshotted on join and
//!   restored on leave or rollback.
//! - **Notifications** ([`RoundEvent`]): what the core tells the
//!   outside world about round and player lifecycle.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how persisted records are
//!   turned into bytes.
//!
//! This crate knows nothing about the host, the scheduler or the round
//! state machine. It only defines data.

mod codec;
mod error;
mod event;
mod geometry;
mod ids;
mod inventory;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::CodecError;
pub use event::RoundEvent;
pub use geometry::{BlockPos, Bounds, Location};
pub use ids::{PlayerId, RoundKey};
pub use inventory::{BlockState, GameMode, Inventory, ItemStack, ARMOR_SLOTS};
