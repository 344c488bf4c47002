//! Minigame: one owner's rounds, arenas and rollback logs.

use std::collections::BTreeMap;

use mglib_host::Host;
use mglib_player::{default_factory, Participant, ParticipantFactory};
use mglib_rollback::{RollbackManager, RollbackStore};
use mglib_tick::TaskHandle;
use mglib_types::{BlockPos, BlockState, Bounds, Location, PlayerId};
use tracing::{info, warn};

use crate::{ArenaData, ArenaStore, BlockRules, Env, MinigameConfig, Round, RoundError};

/// Everything one minigame owns: its config, its arena templates, the
/// rounds currently bound to arenas and the change logs for them.
///
/// Rounds are keyed by arena name; a participant points back at its
/// round through that name only. All lifecycle operations that have
/// side effects take an [`Env`].
pub struct Minigame {
    owner: String,
    config: MinigameConfig,
    factory: ParticipantFactory,
    arenas: Box<dyn ArenaStore>,
    rollback: RollbackManager,
    rounds: BTreeMap<String, Round>,
    exit: Option<Location>,
}

impl Minigame {
    pub fn new(
        owner: impl Into<String>,
        config: MinigameConfig,
        arenas: Box<dyn ArenaStore>,
        rollback_store: Box<dyn RollbackStore>,
    ) -> Self {
        let owner = owner.into();
        let config = config.validated();
        Self {
            rollback: RollbackManager::new(owner.clone(), rollback_store),
            exit: config.default_exit.clone(),
            owner,
            config,
            factory: default_factory(),
            arenas,
            rounds: BTreeMap::new(),
        }
    }

    /// Replaces the participant factory used for players joining from
    /// now on.
    pub fn with_factory(mut self, factory: ParticipantFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn config(&self) -> &MinigameConfig {
        &self.config
    }

    pub fn block_rules(&self) -> &BlockRules {
        &self.config.blocks
    }

    /// Default exit location for players leaving this minigame's rounds.
    pub fn exit_location(&self) -> Option<&Location> {
        self.exit.as_ref()
    }

    /// Sets the default exit. Rounds created afterwards pick it up;
    /// existing rounds keep their own.
    pub fn set_exit_location(&mut self, exit: Option<Location>) {
        self.exit = exit;
    }

    /// Replays change logs left behind by an unclean shutdown.
    pub fn check_rollbacks(&mut self, env: &mut Env<'_>) -> Result<Vec<String>, RoundError> {
        Ok(self.rollback.check_rollbacks(env.host, env.events)?)
    }

    // -----------------------------------------------------------------------
    // Round registry
    // -----------------------------------------------------------------------

    /// Creates an idle round on `arena` with the configured times.
    pub fn create_round(&mut self, arena: &str) -> Result<&mut Round, RoundError> {
        let (preparation, playing) = (self.config.preparation_time, self.config.playing_time);
        self.create_round_with(arena, preparation, playing)
    }

    /// Creates an idle round on `arena` with explicit stage times.
    ///
    /// # Errors
    /// Returns [`RoundError::InvalidState`] if a round already exists on
    /// the arena or the arena has no spawns.
    pub fn create_round_with(
        &mut self,
        arena: &str,
        preparation_time: u32,
        playing_time: u32,
    ) -> Result<&mut Round, RoundError> {
        if self.rounds.contains_key(arena) {
            return Err(RoundError::InvalidState(format!(
                "a round already exists on arena {arena}"
            )));
        }
        let data = self
            .arenas
            .load(arena)?
            .ok_or_else(|| RoundError::ArenaNotFound(arena.to_string()))?;
        if data.spawns.is_empty() {
            return Err(RoundError::InvalidState(format!(
                "arena {arena} has no spawns"
            )));
        }

        let mut round = Round::new(
            &self.owner,
            arena,
            data,
            &self.config,
            self.exit.clone(),
            self.factory.clone(),
        );
        round.set_preparation_time(preparation_time);
        round.set_playing_time(playing_time);
        info!(owner = %self.owner, %arena, "round created");

        Ok(self.rounds.entry(arena.to_string()).or_insert(round))
    }

    pub fn round(&self, arena: &str) -> Option<&Round> {
        self.rounds.get(arena)
    }

    pub fn round_mut(&mut self, arena: &str) -> Option<&mut Round> {
        self.rounds.get_mut(arena)
    }

    pub fn rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds.values()
    }

    /// The round `player` is in, if any.
    pub fn round_of(&self, player: PlayerId) -> Option<&Round> {
        self.rounds.values().find(|r| r.contains(player))
    }

    pub fn participant(&self, player: PlayerId) -> Option<&dyn Participant> {
        self.rounds.values().find_map(|r| r.participant(player))
    }

    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.round_of(player).is_some()
    }

    /// Arena whose round owns the timer `handle`.
    pub fn arena_for_timer(&self, handle: TaskHandle) -> Option<&str> {
        self.rounds
            .values()
            .find(|r| r.timer_handle() == Some(handle))
            .map(Round::arena)
    }

    /// Ends the round on `arena` if it is running, releases anyone still
    /// in it and forgets it.
    pub fn destroy_round(&mut self, env: &mut Env<'_>, arena: &str) -> Result<(), RoundError> {
        let Some(mut round) = self.rounds.remove(arena) else {
            return Err(RoundError::RoundNotFound(arena.to_string()));
        };
        if let Err(e) = round.end(env, &mut self.rollback, false) {
            warn!(owner = %self.owner, %arena, error = %e, "error ending destroyed round");
        }
        // A waiting round is not ended but may still hold players.
        round.release_all(env);
        info!(owner = %self.owner, %arena, "round destroyed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    fn round_entry(&mut self, arena: &str) -> Result<&mut Round, RoundError> {
        self.rounds
            .get_mut(arena)
            .ok_or_else(|| RoundError::RoundNotFound(arena.to_string()))
    }

    pub fn start_round(&mut self, env: &mut Env<'_>, arena: &str) -> Result<(), RoundError> {
        self.round_entry(arena)?.start(env)
    }

    /// Ends the round on `arena`. `Ok(false)` if it was not running.
    pub fn end_round(
        &mut self,
        env: &mut Env<'_>,
        arena: &str,
        timed_out: bool,
    ) -> Result<bool, RoundError> {
        let round = self
            .rounds
            .get_mut(arena)
            .ok_or_else(|| RoundError::RoundNotFound(arena.to_string()))?;
        round.end(env, &mut self.rollback, timed_out)
    }

    /// Advances the round on `arena` by one second.
    pub fn tick_round(&mut self, env: &mut Env<'_>, arena: &str) -> Result<(), RoundError> {
        let round = self
            .rounds
            .get_mut(arena)
            .ok_or_else(|| RoundError::RoundNotFound(arena.to_string()))?;
        round.tick(env, &mut self.rollback)
    }

    /// Adds `player` to the round on `arena`.
    ///
    /// `spawn` picks a spawn by index; `None` or an out-of-range index
    /// falls back to the configured spawn policy.
    pub fn add_player(
        &mut self,
        env: &mut Env<'_>,
        arena: &str,
        player: PlayerId,
        spawn: Option<usize>,
    ) -> Result<(), RoundError> {
        if let Some(current) = self.round_of(player) {
            return Err(RoundError::AlreadyInRound {
                player,
                arena: current.arena().to_string(),
            });
        }
        self.round_entry(arena)?.add_player(env, player, spawn)
    }

    /// Removes `player` from whichever round they are in.
    pub fn remove_player(
        &mut self,
        env: &mut Env<'_>,
        player: PlayerId,
        exit: Option<Location>,
    ) -> Result<Box<dyn Participant>, RoundError> {
        let exit = exit.or_else(|| self.exit.clone());
        let round = self
            .rounds
            .values_mut()
            .find(|r| r.contains(player))
            .ok_or(RoundError::NotPresent(player))?;
        round.remove_player(env, player, exit)
    }

    // -----------------------------------------------------------------------
    // Rollback logging
    // -----------------------------------------------------------------------

    fn logging_round(&self, arena: &str) -> bool {
        self.rounds.get(arena).is_some_and(Round::logs_changes)
    }

    /// Logs the previous state of a block about to change in `arena`.
    ///
    /// Returns `Ok(false)` without writing anything when the arena has
    /// no round, the round has rollback disabled, or it is waiting.
    pub fn log_block_change(
        &mut self,
        arena: &str,
        world: &str,
        pos: BlockPos,
        previous: BlockState,
    ) -> Result<bool, RoundError> {
        if !self.logging_round(arena) {
            return Ok(false);
        }
        self.rollback.log_block_change(arena, world, pos, previous)?;
        Ok(true)
    }

    /// Logs the contents of a container about to change in `arena`.
    /// Same guard as [`log_block_change`](Self::log_block_change).
    pub fn log_inventory_change(
        &mut self,
        host: &dyn Host,
        arena: &str,
        world: &str,
        pos: BlockPos,
    ) -> Result<bool, RoundError> {
        if !self.logging_round(arena) {
            return Ok(false);
        }
        Ok(self.rollback.log_inventory_change(host, arena, world, pos)?)
    }

    /// Records waiting to be rolled back for `arena`.
    pub fn pending_changes(&self, arena: &str) -> Result<usize, RoundError> {
        Ok(self.rollback.pending(arena)?)
    }

    // -----------------------------------------------------------------------
    // Arenas
    // -----------------------------------------------------------------------

    pub fn arena(&self, name: &str) -> Result<Option<ArenaData>, RoundError> {
        Ok(self.arenas.load(name)?)
    }

    pub fn arena_names(&self) -> Result<Vec<String>, RoundError> {
        Ok(self.arenas.names()?)
    }

    /// `true` if any of this minigame's arenas lies in `world`.
    pub fn has_arena_in(&self, world: &str) -> Result<bool, RoundError> {
        for name in self.arenas.names()? {
            if self.arenas.load(&name)?.is_some_and(|a| a.world == world) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Creates an arena with one spawn and optional bounding corners.
    ///
    /// Corners must be in the spawn's world; they are normalised so the
    /// stored bounds are min/max per axis.
    pub fn create_arena(
        &mut self,
        host: &dyn Host,
        name: &str,
        spawn: Location,
        corners: Option<(Location, Location)>,
    ) -> Result<(), RoundError> {
        if !host.world_exists(&spawn.world) {
            return Err(RoundError::InvalidLocation(format!(
                "world {} does not exist",
                spawn.world
            )));
        }
        if self.arenas.load(name)?.is_some() {
            return Err(RoundError::ArenaExists(name.to_string()));
        }
        let bounds = match corners {
            Some((a, b)) => {
                if !a.same_world(&spawn) || !b.same_world(&spawn) {
                    return Err(RoundError::InvalidLocation(
                        "arena corners must be in the spawn's world".into(),
                    ));
                }
                let bounds = Bounds::from_corners((a.x, a.y, a.z), (b.x, b.y, b.z));
                if !bounds.is_finite() {
                    return Err(RoundError::InvalidLocation(
                        "arena corners must have finite coordinates".into(),
                    ));
                }
                Some(bounds)
            }
            None => None,
        };
        let data = ArenaData {
            world: spawn.world.clone(),
            spawns: vec![spawn],
            bounds,
        };
        self.arenas.save(name, &data)?;
        info!(owner = %self.owner, arena = %name, world = %data.world, "arena created");
        Ok(())
    }

    /// Deletes an arena, ending and destroying any round on it.
    pub fn delete_arena(&mut self, env: &mut Env<'_>, name: &str) -> Result<(), RoundError> {
        if self.rounds.contains_key(name) {
            self.destroy_round(env, name)?;
        }
        if !self.arenas.remove(name)? {
            return Err(RoundError::ArenaNotFound(name.to_string()));
        }
        info!(owner = %self.owner, arena = %name, "arena deleted");
        Ok(())
    }

    /// Appends a spawn point to an arena and to its live round.
    pub fn add_spawn(&mut self, arena: &str, spawn: Location) -> Result<(), RoundError> {
        let mut data = self
            .arenas
            .load(arena)?
            .ok_or_else(|| RoundError::ArenaNotFound(arena.to_string()))?;
        if spawn.world != data.world {
            return Err(RoundError::InvalidLocation(format!(
                "spawn is in {} but arena {arena} is in {}",
                spawn.world, data.world
            )));
        }
        data.spawns.push(spawn.clone());
        self.arenas.save(arena, &data)?;
        if let Some(round) = self.rounds.get_mut(arena) {
            round.spawns_mut().push(spawn);
        }
        Ok(())
    }

    /// Removes every spawn of `arena` in the block at `(x, y, z)`.
    /// Returns `Ok(false)` if there was none.
    ///
    /// # Errors
    /// Returns [`RoundError::InvalidState`] if the arena would be left
    /// with no spawns; nothing is removed in that case.
    pub fn delete_spawn(&mut self, arena: &str, x: i32, y: i32, z: i32) -> Result<bool, RoundError> {
        let mut data = self
            .arenas
            .load(arena)?
            .ok_or_else(|| RoundError::ArenaNotFound(arena.to_string()))?;
        let target = BlockPos::new(x, y, z);
        let before = data.spawns.len();
        data.spawns.retain(|s| s.block_pos() != target);
        if data.spawns.len() == before {
            return Ok(false);
        }
        if data.spawns.is_empty() {
            return Err(RoundError::InvalidState(format!(
                "cannot delete the last spawn of arena {arena}"
            )));
        }
        self.arenas.save(arena, &data)?;
        if let Some(round) = self.rounds.get_mut(arena) {
            round.spawns_mut().retain(|s| s.block_pos() != target);
        }
        Ok(true)
    }
}

impl std::fmt::Debug for Minigame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Minigame")
            .field("owner", &self.owner)
            .field("rounds", &self.rounds.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
