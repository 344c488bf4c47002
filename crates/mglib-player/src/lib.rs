//! Participant state for MGLib.
//!
//! This crate owns everything that is keyed by a player rather than by
//! a round:
//!
//! 1. **Participant state**: the [`Participant`] capability trait, its
//!    default implementation [`MgPlayer`], and the
//!    [`ParticipantFactory`] a minigame supplies to construct its own
//!    participant type.
//! 2. **Snapshots**: what a player looked like before joining a round
//!    ([`PlayerSnapshot`]), persisted through a [`PlayerStore`] so it
//!    survives a process restart.
//! 3. **Offline reconciliation**: players who disconnect mid-round get
//!    a pending restore queued; [`reconcile`] applies it when they
//!    come back.
//!
//! # How it fits in the stack
//!
//! ```text
//! Round Layer (above)   ← keeps a roster of Box<dyn Participant>
//!     ↕
//! Player Layer (this crate)
//!     ↕
//! Host + Types (below)  ← inventories, game modes, locations
//! ```
//!
//! A participant refers to its round by arena name only. Looking the
//! round up is the caller's job.

mod error;
mod json_store;
mod participant;
mod reconcile;
mod store;

pub use error::StoreError;
pub use json_store::JsonPlayerStore;
pub use participant::{
    default_factory, MgPlayer, Participant, ParticipantFactory, ParticipantState, PlayerSnapshot,
};
pub use reconcile::reconcile;
pub use store::{MemoryPlayerStore, PlayerStore};
