//! Change log records.

use mglib_types::{BlockPos, BlockState, Inventory};
use serde::{Deserialize, Serialize};

/// One logged mutation: which cell changed and what it held before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Append order within the manager that wrote it.
    pub seq: u64,
    pub world: String,
    pub pos: BlockPos,
    pub change: Change,
}

/// The pre-image of a mutated cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Block { previous: BlockState },
    Container { previous: Inventory },
}
