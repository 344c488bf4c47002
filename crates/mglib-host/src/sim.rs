//! In-memory host.
//!
//! `SimHost` keeps players, blocks and containers in plain maps. It
//! behaves like a real server for everything the core asks of it:
//! offline players reject actor calls, unknown worlds reject world
//! calls, and unset cells read as air.

use std::collections::{HashMap, HashSet};

use mglib_types::{BlockPos, BlockState, GameMode, Inventory, Location, PlayerId};

use crate::{Host, HostError};

/// Player slots a fresh simulated inventory has.
const PLAYER_INVENTORY_SIZE: usize = 36;

/// State of one simulated player.
#[derive(Debug, Clone)]
pub struct SimPlayer {
    pub name: String,
    pub online: bool,
    pub location: Location,
    pub inventory: Inventory,
    pub game_mode: GameMode,
    pub effects: Vec<String>,
    /// Chat messages delivered to this player, oldest first.
    pub messages: Vec<String>,
    /// When set, teleports of this player are rejected.
    pub deny_teleport: bool,
}

/// In-memory [`Host`] implementation.
#[derive(Debug, Default)]
pub struct SimHost {
    players: HashMap<PlayerId, SimPlayer>,
    worlds: HashSet<String>,
    blocks: HashMap<(String, BlockPos), BlockState>,
    containers: HashMap<(String, BlockPos), Inventory>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a world so locations and cells in it become valid.
    pub fn add_world(&mut self, world: impl Into<String>) -> &mut Self {
        self.worlds.insert(world.into());
        self
    }

    /// Connects a player at `location`, creating them on first sight.
    ///
    /// A returning player keeps inventory and game mode from their last
    /// session, like a real server keeps player data on disk.
    pub fn connect(&mut self, id: PlayerId, name: impl Into<String>, location: Location) {
        let name = name.into();
        let player = self.players.entry(id).or_insert_with(|| SimPlayer {
            name: name.clone(),
            online: true,
            location: location.clone(),
            inventory: Inventory::with_size(PLAYER_INVENTORY_SIZE),
            game_mode: GameMode::Survival,
            effects: Vec::new(),
            messages: Vec::new(),
            deny_teleport: false,
        });
        player.name = name;
        player.online = true;
        player.location = location;
    }

    /// Drops a player's connection. Their data stays.
    pub fn disconnect(&mut self, id: PlayerId) {
        if let Some(player) = self.players.get_mut(&id) {
            player.online = false;
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&SimPlayer> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut SimPlayer> {
        self.players.get_mut(&id)
    }

    /// Moves a player without going through [`Host::teleport`]. Simulates
    /// the player walking.
    pub fn walk(&mut self, id: PlayerId, x: f64, y: f64, z: f64) {
        if let Some(player) = self.players.get_mut(&id) {
            player.location.x = x;
            player.location.y = y;
            player.location.z = z;
        }
    }

    /// Places an empty container block of `size` slots.
    pub fn place_container(&mut self, world: &str, pos: BlockPos, size: usize) {
        self.blocks
            .insert((world.to_string(), pos), BlockState::new("chest"));
        self.containers
            .insert((world.to_string(), pos), Inventory::with_size(size));
    }

    /// Number of non-air cells in a world.
    pub fn solid_blocks(&self, world: &str) -> usize {
        self.blocks
            .iter()
            .filter(|((w, _), state)| w == world && !state.is_air())
            .count()
    }

    fn online(&self, id: PlayerId) -> Result<&SimPlayer, HostError> {
        match self.players.get(&id) {
            Some(p) if p.online => Ok(p),
            Some(_) => Err(HostError::PlayerOffline(id)),
            None => Err(HostError::UnknownPlayer(id)),
        }
    }

    fn online_mut(&mut self, id: PlayerId) -> Result<&mut SimPlayer, HostError> {
        match self.players.get_mut(&id) {
            Some(p) if p.online => Ok(p),
            Some(_) => Err(HostError::PlayerOffline(id)),
            None => Err(HostError::UnknownPlayer(id)),
        }
    }

    fn check_world(&self, world: &str) -> Result<(), HostError> {
        if self.worlds.contains(world) {
            Ok(())
        } else {
            Err(HostError::UnknownWorld(world.to_string()))
        }
    }
}

impl Host for SimHost {
    fn is_online(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.online)
    }

    fn player_name(&self, player: PlayerId) -> Option<String> {
        self.players.get(&player).map(|p| p.name.clone())
    }

    fn resolve_name(&self, name: &str) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, p)| p.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id)
    }

    fn location(&self, player: PlayerId) -> Result<Location, HostError> {
        Ok(self.online(player)?.location.clone())
    }

    fn teleport(&mut self, player: PlayerId, to: &Location) -> Result<(), HostError> {
        self.check_world(&to.world)?;
        let p = self.online_mut(player)?;
        if p.deny_teleport {
            return Err(HostError::Rejected(format!("teleport of {player} cancelled")));
        }
        p.location = to.clone();
        Ok(())
    }

    fn inventory(&self, player: PlayerId) -> Result<Inventory, HostError> {
        Ok(self.online(player)?.inventory.clone())
    }

    fn set_inventory(&mut self, player: PlayerId, inventory: Inventory) -> Result<(), HostError> {
        self.online_mut(player)?.inventory = inventory;
        Ok(())
    }

    fn game_mode(&self, player: PlayerId) -> Result<GameMode, HostError> {
        Ok(self.online(player)?.game_mode)
    }

    fn set_game_mode(&mut self, player: PlayerId, mode: GameMode) -> Result<(), HostError> {
        self.online_mut(player)?.game_mode = mode;
        Ok(())
    }

    fn clear_effects(&mut self, player: PlayerId) -> Result<(), HostError> {
        self.online_mut(player)?.effects.clear();
        Ok(())
    }

    fn send_message(&mut self, player: PlayerId, message: &str) -> Result<(), HostError> {
        self.online_mut(player)?.messages.push(message.to_string());
        Ok(())
    }

    fn world_exists(&self, world: &str) -> bool {
        self.worlds.contains(world)
    }

    fn block(&self, world: &str, pos: BlockPos) -> Result<BlockState, HostError> {
        self.check_world(world)?;
        Ok(self
            .blocks
            .get(&(world.to_string(), pos))
            .cloned()
            .unwrap_or_else(BlockState::air))
    }

    fn set_block(
        &mut self,
        world: &str,
        pos: BlockPos,
        state: &BlockState,
    ) -> Result<(), HostError> {
        self.check_world(world)?;
        let key = (world.to_string(), pos);
        if state.is_air() {
            self.blocks.remove(&key);
            self.containers.remove(&key);
        } else {
            self.blocks.insert(key, state.clone());
        }
        Ok(())
    }

    fn container(&self, world: &str, pos: BlockPos) -> Result<Inventory, HostError> {
        self.check_world(world)?;
        self.containers
            .get(&(world.to_string(), pos))
            .cloned()
            .ok_or_else(|| HostError::NoContainer {
                world: world.to_string(),
                pos,
            })
    }

    fn set_container(
        &mut self,
        world: &str,
        pos: BlockPos,
        inventory: &Inventory,
    ) -> Result<(), HostError> {
        self.check_world(world)?;
        match self.containers.get_mut(&(world.to_string(), pos)) {
            Some(slot) => {
                *slot = inventory.clone();
                Ok(())
            }
            None => Err(HostError::NoContainer {
                world: world.to_string(),
                pos,
            }),
        }
    }
}
