//! The rollback manager: per-owner change logging and replay.

use mglib_host::{EventSink, Host};
use mglib_types::{BlockPos, BlockState, RoundEvent, RoundKey};
use tracing::{debug, error, info, warn};

use crate::{Change, ChangeRecord, RollbackError, RollbackStore};

/// Records world mutations for one minigame's arenas and undoes them.
///
/// The manager does not know about rounds. Whether a change should be
/// logged at all (rollback enabled, round not waiting) is decided by the
/// round layer before calling in.
pub struct RollbackManager {
    owner: String,
    store: Box<dyn RollbackStore>,
    next_seq: u64,
}

impl RollbackManager {
    pub fn new(owner: impl Into<String>, store: Box<dyn RollbackStore>) -> Self {
        Self {
            owner: owner.into(),
            store,
            next_seq: 0,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Records `previous` as the state of `pos` before a mutation.
    pub fn log_block_change(
        &mut self,
        arena: &str,
        world: &str,
        pos: BlockPos,
        previous: BlockState,
    ) -> Result<(), RollbackError> {
        self.append(arena, world, pos, Change::Block { previous })
    }

    /// Records the current contents of the container at `pos`.
    ///
    /// Must be called before the mutation commits: the host is read
    /// here, so calling it afterwards would log the post-image. A
    /// position without a container is logged as nothing.
    pub fn log_inventory_change(
        &mut self,
        host: &dyn Host,
        arena: &str,
        world: &str,
        pos: BlockPos,
    ) -> Result<bool, RollbackError> {
        let previous = match host.container(world, pos) {
            Ok(inv) => inv,
            Err(e) => {
                debug!(arena, world, ?pos, error = %e, "no container to log");
                return Ok(false);
            }
        };
        self.append(arena, world, pos, Change::Container { previous })?;
        Ok(true)
    }

    fn append(
        &mut self,
        arena: &str,
        world: &str,
        pos: BlockPos,
        change: Change,
    ) -> Result<(), RollbackError> {
        let record = ChangeRecord {
            seq: self.next_seq,
            world: world.to_string(),
            pos,
            change,
        };
        self.store.append(arena, &record)?;
        self.next_seq += 1;
        Ok(())
    }

    /// Number of records waiting to be replayed for `arena`.
    pub fn pending(&self, arena: &str) -> Result<usize, RollbackError> {
        Ok(self.store.load(arena)?.len())
    }

    /// Replays `arena`'s log newest-first, clears it and emits
    /// [`RoundEvent::RoundRolledBack`]. Returns the number of records
    /// replayed.
    ///
    /// A record the host refuses (unknown world, container gone) is
    /// logged and skipped. If the process dies halfway, the log is
    /// still in the store and replaying it again is harmless.
    pub fn rollback(
        &mut self,
        host: &mut dyn Host,
        events: &mut dyn EventSink,
        arena: &str,
    ) -> Result<usize, RollbackError> {
        let records = self.store.load(arena)?;
        for record in records.iter().rev() {
            let result = match &record.change {
                Change::Block { previous } => host.set_block(&record.world, record.pos, previous),
                Change::Container { previous } => {
                    host.set_container(&record.world, record.pos, previous)
                }
            };
            if let Err(e) = result {
                warn!(
                    owner = %self.owner,
                    arena,
                    seq = record.seq,
                    error = %e,
                    "could not restore logged change"
                );
            }
        }
        self.store.clear(arena)?;

        info!(owner = %self.owner, arena, records = records.len(), "arena rolled back");
        events.emit(RoundEvent::RoundRolledBack {
            round: RoundKey::new(self.owner.clone(), arena),
            records: records.len(),
        });
        Ok(records.len())
    }

    /// Replays every log left over from an unclean shutdown.
    ///
    /// Returns the arenas that were rolled back. An arena whose log
    /// cannot be read is reported and left for the next attempt.
    pub fn check_rollbacks(
        &mut self,
        host: &mut dyn Host,
        events: &mut dyn EventSink,
    ) -> Result<Vec<String>, RollbackError> {
        let pending = self.store.pending_arenas()?;
        let mut done = Vec::with_capacity(pending.len());
        for arena in pending {
            match self.rollback(host, events, &arena) {
                Ok(_) => done.push(arena),
                Err(e) => {
                    error!(owner = %self.owner, %arena, error = %e, "startup rollback failed");
                }
            }
        }
        if !done.is_empty() {
            info!(owner = %self.owner, arenas = done.len(), "recovered unfinished rollbacks");
        }
        Ok(done)
    }
}

impl std::fmt::Debug for RollbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackManager")
            .field("owner", &self.owner)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use mglib_host::{EventLog, SimHost};

    use super::*;
    use crate::MemoryRollbackStore;

    fn setup() -> (SimHost, EventLog, RollbackManager) {
        let mut host = SimHost::new();
        host.add_world("arena");
        let manager = RollbackManager::new("spleef", Box::new(MemoryRollbackStore::new()));
        (host, EventLog::new(), manager)
    }

    #[test]
    fn test_reverse_replay_restores_first_previous_state() {
        let (mut host, mut events, mut rb) = setup();
        let pos = BlockPos::new(1, 64, 1);

        // snow -> stone -> glass, logging each pre-image.
        host.set_block("arena", pos, &BlockState::new("snow")).unwrap();
        rb.log_block_change("a1", "arena", pos, BlockState::new("snow")).unwrap();
        host.set_block("arena", pos, &BlockState::new("stone")).unwrap();
        rb.log_block_change("a1", "arena", pos, BlockState::new("stone")).unwrap();
        host.set_block("arena", pos, &BlockState::new("glass")).unwrap();

        assert_eq!(rb.rollback(&mut host, &mut events, "a1").unwrap(), 2);
        assert_eq!(host.block("arena", pos).unwrap(), BlockState::new("snow"));
        assert_eq!(rb.pending("a1").unwrap(), 0);
    }

    #[test]
    fn test_second_rollback_is_a_noop() {
        let (mut host, mut events, mut rb) = setup();
        let pos = BlockPos::new(0, 10, 0);
        rb.log_block_change("a1", "arena", pos, BlockState::new("snow")).unwrap();
        host.set_block("arena", pos, &BlockState::air()).unwrap();

        rb.rollback(&mut host, &mut events, "a1").unwrap();
        let after_first = host.block("arena", pos).unwrap();
        assert_eq!(rb.rollback(&mut host, &mut events, "a1").unwrap(), 0);
        assert_eq!(host.block("arena", pos).unwrap(), after_first);
    }

    #[test]
    fn test_logs_are_per_arena() {
        let (mut host, mut events, mut rb) = setup();
        rb.log_block_change("a1", "arena", BlockPos::new(0, 0, 0), BlockState::air()).unwrap();
        rb.log_block_change("a2", "arena", BlockPos::new(1, 0, 0), BlockState::air()).unwrap();

        rb.rollback(&mut host, &mut events, "a1").unwrap();
        assert_eq!(rb.pending("a1").unwrap(), 0);
        assert_eq!(rb.pending("a2").unwrap(), 1);
    }

    #[test]
    fn test_inventory_change_without_container_logs_nothing() {
        let (host, _, mut rb) = setup();
        let logged = rb
            .log_inventory_change(&host, "a1", "arena", BlockPos::new(5, 5, 5))
            .unwrap();
        assert!(!logged);
        assert_eq!(rb.pending("a1").unwrap(), 0);
    }

    #[test]
    fn test_rollback_emits_event_with_record_count() {
        let (mut host, mut events, mut rb) = setup();
        rb.log_block_change("a1", "arena", BlockPos::new(0, 0, 0), BlockState::air()).unwrap();
        rb.rollback(&mut host, &mut events, "a1").unwrap();

        assert_eq!(
            events.events(),
            &[RoundEvent::RoundRolledBack {
                round: RoundKey::new("spleef", "a1"),
                records: 1,
            }]
        );
    }
}
