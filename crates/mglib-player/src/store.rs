//! The player store contract and its in-memory implementation.

use std::collections::HashMap;

use mglib_types::{Location, PlayerId};

use crate::{PlayerSnapshot, StoreError};

/// Durable per-player records, keyed by stable id.
///
/// Two kinds of record live here:
///
/// - **snapshots**: written on join, removed once restored on a live
///   leave. A snapshot with no pending restore, for a player in no
///   round, means the process died while the player was in a round;
///   [`reconcile`](crate::reconcile) restores it on the next connect.
/// - **pending restores**: the exit location of a player who left a
///   round while offline. Applied and cleared by [`reconcile`](crate::reconcile)
///   on the next connect.
pub trait PlayerStore: Send + 'static {
    fn save_snapshot(&mut self, player: PlayerId, snapshot: &PlayerSnapshot)
    -> Result<(), StoreError>;

    fn load_snapshot(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StoreError>;

    /// Removing a missing snapshot is not an error.
    fn remove_snapshot(&mut self, player: PlayerId) -> Result<(), StoreError>;

    fn queue_restore(&mut self, player: PlayerId, exit: &Location) -> Result<(), StoreError>;

    fn pending_restore(&self, player: PlayerId) -> Result<Option<Location>, StoreError>;

    fn clear_restore(&mut self, player: PlayerId) -> Result<(), StoreError>;
}

/// [`PlayerStore`] backed by two hash maps. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryPlayerStore {
    snapshots: HashMap<PlayerId, PlayerSnapshot>,
    restores: HashMap<PlayerId, Location>,
    reject_writes: bool,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::Rejected`].
    pub fn reject_writes(&mut self, reject: bool) {
        self.reject_writes = reject;
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn restore_count(&self) -> usize {
        self.restores.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.reject_writes {
            return Err(StoreError::Rejected("store is read-only".into()));
        }
        Ok(())
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn save_snapshot(
        &mut self,
        player: PlayerId,
        snapshot: &PlayerSnapshot,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        self.snapshots.insert(player, snapshot.clone());
        Ok(())
    }

    fn load_snapshot(&self, player: PlayerId) -> Result<Option<PlayerSnapshot>, StoreError> {
        Ok(self.snapshots.get(&player).cloned())
    }

    fn remove_snapshot(&mut self, player: PlayerId) -> Result<(), StoreError> {
        self.check_writable()?;
        self.snapshots.remove(&player);
        Ok(())
    }

    fn queue_restore(&mut self, player: PlayerId, exit: &Location) -> Result<(), StoreError> {
        self.check_writable()?;
        self.restores.insert(player, exit.clone());
        Ok(())
    }

    fn pending_restore(&self, player: PlayerId) -> Result<Option<Location>, StoreError> {
        Ok(self.restores.get(&player).cloned())
    }

    fn clear_restore(&mut self, player: PlayerId) -> Result<(), StoreError> {
        self.check_writable()?;
        self.restores.remove(&player);
        Ok(())
    }
}
