//! Where change logs live.

use std::collections::BTreeMap;

use crate::{ChangeRecord, RollbackError};

/// Per-arena, append-only storage for change records.
pub trait RollbackStore: Send + 'static {
    /// Appends one record to the end of `arena`'s log.
    fn append(&mut self, arena: &str, record: &ChangeRecord) -> Result<(), RollbackError>;

    /// The whole log for `arena`, in append order. Empty if none.
    fn load(&self, arena: &str) -> Result<Vec<ChangeRecord>, RollbackError>;

    /// Drops `arena`'s log. Clearing a missing log is not an error.
    fn clear(&mut self, arena: &str) -> Result<(), RollbackError>;

    /// Arenas with a non-empty log.
    fn pending_arenas(&self) -> Result<Vec<String>, RollbackError>;
}

/// In-memory [`RollbackStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryRollbackStore {
    logs: BTreeMap<String, Vec<ChangeRecord>>,
}

impl MemoryRollbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RollbackStore for MemoryRollbackStore {
    fn append(&mut self, arena: &str, record: &ChangeRecord) -> Result<(), RollbackError> {
        self.logs
            .entry(arena.to_string())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn load(&self, arena: &str) -> Result<Vec<ChangeRecord>, RollbackError> {
        Ok(self.logs.get(arena).cloned().unwrap_or_default())
    }

    fn clear(&mut self, arena: &str) -> Result<(), RollbackError> {
        self.logs.remove(arena);
        Ok(())
    }

    fn pending_arenas(&self) -> Result<Vec<String>, RollbackError> {
        Ok(self
            .logs
            .iter()
            .filter(|(_, log)| !log.is_empty())
            .map(|(arena, _)| arena.clone())
            .collect())
    }
}
