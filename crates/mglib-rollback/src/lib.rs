//! World change logging and rollback for MGLib.
//!
//! While a round is live, every block or container it is about to
//! mutate is recorded as a [`ChangeRecord`] holding the *previous*
//! state. At round end the [`RollbackManager`] replays the log in
//! reverse order and clears it, putting the arena back the way it was.
//!
//! Logs are kept in a [`RollbackStore`]. With a durable store
//! ([`JsonRollbackStore`]) a log that was never replayed, because the
//! process died mid-round, is still there at the next startup and
//! [`RollbackManager::check_rollbacks`] replays it.
//!
//! Replay is idempotent: each record writes an absolute previous state,
//! so replaying a log again on an already-restored arena changes
//! nothing.

mod error;
mod json_store;
mod manager;
mod record;
mod store;

pub use error::RollbackError;
pub use json_store::JsonRollbackStore;
pub use manager::RollbackManager;
pub use record::{Change, ChangeRecord};
pub use store::{MemoryRollbackStore, RollbackStore};
