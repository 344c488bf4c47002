//! Inventory, game mode and block state: the host state MGLib snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of armor slots on a player inventory.
pub const ARMOR_SLOTS: usize = 4;

/// A stack of items in one inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: String,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(material: impl Into<String>, amount: u32) -> Self {
        Self {
            material: material.into(),
            amount,
        }
    }
}

/// The contents of a player inventory or a block container.
///
/// Containers (chests, furnaces, ...) simply leave `armor` empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub contents: Vec<Option<ItemStack>>,
    #[serde(default)]
    pub armor: [Option<ItemStack>; ARMOR_SLOTS],
}

impl Inventory {
    /// An empty inventory with `size` content slots.
    pub fn with_size(size: usize) -> Self {
        Self {
            contents: vec![None; size],
            armor: Default::default(),
        }
    }

    /// Returns `true` if no slot (content or armor) holds anything.
    pub fn is_empty(&self) -> bool {
        self.contents.iter().all(Option::is_none) && self.armor.iter().all(Option::is_none)
    }

    /// Empties every slot, keeping the slot count.
    pub fn clear(&mut self) {
        self.contents.iter_mut().for_each(|slot| *slot = None);
        self.armor = Default::default();
    }

    /// Returns an empty inventory shaped like this one.
    pub fn cleared(&self) -> Self {
        Self::with_size(self.contents.len())
    }
}

/// Host game mode. Saved on join and restored on leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Survival => write!(f, "survival"),
            Self::Creative => write!(f, "creative"),
            Self::Adventure => write!(f, "adventure"),
            Self::Spectator => write!(f, "spectator"),
        }
    }
}

/// The state of one world cell, as much as rollback needs to put it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    /// Host material name, e.g. `"stone"`.
    pub material: String,
    /// Host-specific variant data (orientation, colour, ...).
    #[serde(default)]
    pub data: u8,
}

impl BlockState {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            data: 0,
        }
    }

    pub fn with_data(material: impl Into<String>, data: u8) -> Self {
        Self {
            material: material.into(),
            data,
        }
    }

    /// The empty cell.
    pub fn air() -> Self {
        Self::new("air")
    }

    pub fn is_air(&self) -> bool {
        self.material == "air"
    }
}
