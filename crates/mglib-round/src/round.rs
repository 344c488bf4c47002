//! The round state machine.
//!
//! A [`Round`] is one session of a minigame bound to one arena. It owns
//! its roster, its timer handle and its copy of the minigame settings.
//! Lifecycle operations (start, tick, end, join, leave) go through the
//! owning [`Minigame`](crate::Minigame), which can check cross-round
//! rules and hand in the rollback manager. Everything else is public
//! here.

use std::collections::BTreeMap;

use mglib_host::HostError;
use mglib_player::{Participant, ParticipantFactory, PlayerSnapshot};
use mglib_rollback::RollbackManager;
use mglib_tick::{TaskHandle, TICKS_PER_SECOND};
use mglib_types::{Bounds, GameMode, Location, PlayerId, RoundEvent, RoundKey};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{ArenaData, Env, MinigameConfig, RoundError, SpawnPolicy, Stage};

/// One running (or idle) session of a minigame on an arena.
pub struct Round {
    owner: String,
    arena: String,
    world: String,

    stage: Stage,
    /// Seconds spent in the current stage; -1 while no timer runs.
    elapsed: i64,
    timer: Option<TaskHandle>,

    preparation_time: u32,
    playing_time: u32,
    min_players: usize,
    max_players: usize,

    spawns: Vec<Location>,
    bounds: Option<Bounds>,
    exit: Option<Location>,

    pvp: bool,
    damage: bool,
    rollback: bool,

    spawn_policy: SpawnPolicy,
    allow_join_while_preparing: bool,
    allow_join_in_progress: bool,
    spectate_on_join: bool,
    default_game_mode: GameMode,

    roster: BTreeMap<PlayerId, Box<dyn Participant>>,
    factory: ParticipantFactory,
    metadata: BTreeMap<String, Value>,
}

impl Round {
    pub(crate) fn new(
        owner: &str,
        arena: &str,
        data: ArenaData,
        config: &MinigameConfig,
        exit: Option<Location>,
        factory: ParticipantFactory,
    ) -> Self {
        Self {
            owner: owner.to_string(),
            arena: arena.to_string(),
            world: data.world,
            stage: Stage::Waiting,
            elapsed: -1,
            timer: None,
            preparation_time: config.preparation_time,
            playing_time: config.playing_time,
            min_players: config.min_players,
            max_players: config.max_players,
            spawns: data.spawns,
            bounds: data.bounds.map(Bounds::normalized),
            exit,
            pvp: config.pvp,
            damage: config.damage,
            rollback: config.rollback,
            spawn_policy: config.spawn_policy,
            allow_join_while_preparing: config.allow_join_while_preparing,
            allow_join_in_progress: config.allow_join_in_progress,
            spectate_on_join: config.spectate_on_join,
            default_game_mode: config.default_game_mode,
            roster: BTreeMap::new(),
            factory,
            metadata: BTreeMap::new(),
        }
    }

    fn key(&self) -> RoundKey {
        RoundKey::new(self.owner.clone(), self.arena.clone())
    }

    // -- identity & timing -------------------------------------------------

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn arena(&self) -> &str {
        &self.arena
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_running(&self) -> bool {
        self.stage.is_running()
    }

    /// Seconds spent in the current stage, or -1 when the round is not
    /// running.
    pub fn elapsed(&self) -> i64 {
        self.elapsed
    }

    /// Seconds left in the current stage, or -1 when the stage has no
    /// limit or the round is not running.
    pub fn remaining_time(&self) -> i64 {
        let limit = match self.stage {
            Stage::Preparing => self.preparation_time,
            Stage::Playing => self.playing_time,
            Stage::Waiting | Stage::Ending => return -1,
        };
        if limit == 0 {
            return -1;
        }
        i64::from(limit) - self.elapsed
    }

    /// Pushes the timer forward by `seconds`, shortening the current
    /// stage. No effect unless the round is running.
    pub fn add_time(&mut self, seconds: u32) {
        if self.is_running() {
            self.elapsed += i64::from(seconds);
        }
    }

    /// Winds the timer back by `seconds`, never below 0, lengthening the
    /// current stage. No effect unless the round is running.
    pub fn subtract_time(&mut self, seconds: u32) {
        if self.is_running() {
            self.elapsed = (self.elapsed - i64::from(seconds)).max(0);
        }
    }

    /// Handle of the once-per-second timer while the round is running.
    pub fn timer_handle(&self) -> Option<TaskHandle> {
        self.timer
    }

    pub fn preparation_time(&self) -> u32 {
        self.preparation_time
    }

    pub fn set_preparation_time(&mut self, seconds: u32) {
        self.preparation_time = seconds;
    }

    pub fn playing_time(&self) -> u32 {
        self.playing_time
    }

    pub fn set_playing_time(&mut self, seconds: u32) {
        self.playing_time = seconds;
    }

    // -- limits & flags ----------------------------------------------------

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    pub fn set_min_players(&mut self, min: usize) {
        self.min_players = min;
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn set_max_players(&mut self, max: usize) {
        self.max_players = max;
    }

    pub fn is_pvp_allowed(&self) -> bool {
        self.pvp
    }

    pub fn set_pvp_allowed(&mut self, allowed: bool) {
        self.pvp = allowed;
    }

    pub fn is_damage_allowed(&self) -> bool {
        self.damage
    }

    pub fn set_damage_allowed(&mut self, allowed: bool) {
        self.damage = allowed;
    }

    pub fn is_rollback_enabled(&self) -> bool {
        self.rollback
    }

    pub fn set_rollback_enabled(&mut self, enabled: bool) {
        self.rollback = enabled;
    }

    /// Whether world changes made now should be logged for rollback.
    pub fn logs_changes(&self) -> bool {
        self.rollback && self.stage != Stage::Waiting
    }

    pub fn spawn_policy(&self) -> SpawnPolicy {
        self.spawn_policy
    }

    pub fn set_spawn_policy(&mut self, policy: SpawnPolicy) {
        self.spawn_policy = policy;
    }

    // -- geometry ----------------------------------------------------------

    pub fn spawns(&self) -> &[Location] {
        &self.spawns
    }

    pub(crate) fn spawns_mut(&mut self) -> &mut Vec<Location> {
        &mut self.spawns
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// Replaces the arena bounds. Corners are normalised; bounds with a
    /// non-finite coordinate are rejected.
    pub fn set_bounds(&mut self, bounds: Option<Bounds>) -> Result<(), RoundError> {
        if let Some(b) = &bounds {
            if !b.is_finite() {
                return Err(RoundError::InvalidLocation(format!(
                    "bounds of {} must be finite",
                    self.arena
                )));
            }
        }
        self.bounds = bounds.map(Bounds::normalized);
        Ok(())
    }

    pub fn exit_location(&self) -> Option<&Location> {
        self.exit.as_ref()
    }

    pub fn set_exit_location(&mut self, exit: Option<Location>) {
        self.exit = exit;
    }

    // -- metadata ----------------------------------------------------------

    /// Arbitrary values a minigame attaches to the round. They outlive
    /// the round's runs and are dropped with the round.
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Sets `key`, returning the value it replaced.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.metadata.insert(key.into(), value.into())
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<Value> {
        self.metadata.remove(key)
    }

    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    pub fn all_metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    // -- roster ------------------------------------------------------------

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn alive_count(&self) -> usize {
        self.roster.values().filter(|p| !p.is_spectating()).count()
    }

    pub fn spectator_count(&self) -> usize {
        self.roster.values().filter(|p| p.is_spectating()).count()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.roster.contains_key(&player)
    }

    pub fn participant(&self, player: PlayerId) -> Option<&dyn Participant> {
        self.roster.get(&player).map(|p| p.as_ref())
    }

    pub fn participant_mut(&mut self, player: PlayerId) -> Option<&mut (dyn Participant + 'static)> {
        self.roster.get_mut(&player).map(|p| p.as_mut())
    }

    pub fn participants(&self) -> impl Iterator<Item = &dyn Participant> {
        self.roster.values().map(|p| p.as_ref())
    }

    pub fn alive_participants(&self) -> impl Iterator<Item = &dyn Participant> {
        self.participants().filter(|p| !p.is_spectating())
    }

    pub fn spectators(&self) -> impl Iterator<Item = &dyn Participant> {
        self.participants().filter(|p| p.is_spectating())
    }

    /// Participants assigned to `team`.
    pub fn team(&self, team: &str) -> impl Iterator<Item = &dyn Participant> {
        self.participants().filter(move |p| p.team() == Some(team))
    }

    /// Sends `message` to every participant, optionally skipping
    /// spectators. Delivery failures are ignored.
    pub fn broadcast(&self, env: &mut Env<'_>, message: &str, include_spectators: bool) {
        for p in self.participants() {
            if include_spectators || !p.is_spectating() {
                if let Err(e) = env.host.send_message(p.id(), message) {
                    debug!(player = %p.id(), error = %e, "broadcast not delivered");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub(crate) fn start(&mut self, env: &mut Env<'_>) -> Result<(), RoundError> {
        if self.stage != Stage::Waiting {
            return Err(RoundError::InvalidState(format!(
                "cannot start round on {} in stage {}",
                self.arena, self.stage
            )));
        }

        self.elapsed = 0;
        if self.preparation_time > 0 {
            self.stage = Stage::Preparing;
            env.events.emit(RoundEvent::RoundPreparing { round: self.key() });
        } else {
            self.stage = Stage::Playing;
            env.events.emit(RoundEvent::RoundStarted { round: self.key() });
        }
        self.timer = Some(env.scheduler.schedule_repeating(TICKS_PER_SECOND));

        info!(
            owner = %self.owner,
            arena = %self.arena,
            stage = %self.stage,
            players = self.roster.len(),
            "round started"
        );
        Ok(())
    }

    /// One second of round time.
    ///
    /// Order within a tick: stage transition check, elapsed increment
    /// (skipped when the stage changed), border enforcement, then the
    /// tick notification if the round is still running.
    pub(crate) fn tick(
        &mut self,
        env: &mut Env<'_>,
        rollback: &mut RollbackManager,
    ) -> Result<(), RoundError> {
        if !self.is_running() {
            return Ok(());
        }

        let old_elapsed = self.elapsed;
        let mut stage_changed = false;
        let limit = match self.stage {
            Stage::Preparing => self.preparation_time,
            _ => self.playing_time,
        };

        if limit > 0 && self.elapsed >= i64::from(limit) {
            stage_changed = true;
            if self.stage == Stage::Preparing {
                self.stage = Stage::Playing;
                self.elapsed = 0;
                env.events.emit(RoundEvent::RoundStarted { round: self.key() });
                info!(owner = %self.owner, arena = %self.arena, "preparation over, round playing");
            } else {
                self.end(env, rollback, true)?;
            }
        }
        if !stage_changed {
            self.elapsed += 1;
        }

        self.enforce_bounds(env);

        if self.is_running() {
            env.events.emit(RoundEvent::RoundTicked {
                round: self.key(),
                old_elapsed,
                stage_changed,
            });
        }
        Ok(())
    }

    fn enforce_bounds(&mut self, env: &mut Env<'_>) {
        let Some(bounds) = self.bounds else {
            return;
        };
        for &player in self.roster.keys() {
            let Ok(location) = env.host.location(player) else {
                continue;
            };
            let Some(clamped) = bounds.clamp(&location) else {
                continue;
            };
            if let Err(e) = env.host.teleport(player, &clamped) {
                warn!(%player, arena = %self.arena, error = %e, "could not push player back inside arena");
            }
            env.events.emit(RoundEvent::PlayerHitBorder {
                round: self.key(),
                player,
            });
        }
    }

    /// Stops the round, empties the roster and rolls the arena back.
    ///
    /// Returns `Ok(false)` without doing anything when the round is not
    /// running, so ending twice is harmless. Participants that cannot be
    /// removed cleanly are detached anyway.
    pub(crate) fn end(
        &mut self,
        env: &mut Env<'_>,
        rollback: &mut RollbackManager,
        timed_out: bool,
    ) -> Result<bool, RoundError> {
        if matches!(self.stage, Stage::Waiting | Stage::Ending) {
            return Ok(false);
        }

        if let Some(timer) = self.timer.take() {
            env.scheduler.cancel(timer);
        }
        self.elapsed = -1;
        self.stage = Stage::Ending;

        self.release_all(env);

        self.stage = Stage::Waiting;
        env.events.emit(RoundEvent::RoundEnded {
            round: self.key(),
            timed_out,
        });
        info!(owner = %self.owner, arena = %self.arena, timed_out, "round ended");

        if self.rollback {
            if let Err(e) = rollback.rollback(env.host, env.events, &self.arena) {
                warn!(arena = %self.arena, error = %e, "rollback failed, log kept for next startup");
            }
        }
        Ok(true)
    }

    /// Removes every participant. Participants that cannot be removed
    /// cleanly are detached anyway.
    pub(crate) fn release_all(&mut self, env: &mut Env<'_>) {
        let players: Vec<PlayerId> = self.roster.keys().copied().collect();
        for player in players {
            if let Err(e) = self.remove_player(env, player, None) {
                warn!(%player, arena = %self.arena, error = %e, "forcing player out of round");
                if let Some(mut p) = self.roster.remove(&player) {
                    detach(p.as_mut());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Joining and leaving
    // -----------------------------------------------------------------------

    fn join_allowed(&self) -> Result<(), RoundError> {
        let allowed = match self.stage {
            Stage::Waiting => true,
            Stage::Preparing => self.allow_join_while_preparing,
            Stage::Playing => self.allow_join_in_progress,
            Stage::Ending => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(RoundError::InvalidState(format!(
                "round on {} does not accept players while {}",
                self.arena, self.stage
            )))
        }
    }

    fn pick_spawn(&self, requested: Option<usize>) -> Option<Location> {
        if let Some(spawn) = requested.and_then(|i| self.spawns.get(i)) {
            return Some(spawn.clone());
        }
        if self.spawns.is_empty() {
            return None;
        }
        let index = match self.spawn_policy {
            SpawnPolicy::Random => rand::rng().random_range(0..self.spawns.len()),
            SpawnPolicy::Sequential => self.roster.len() % self.spawns.len(),
        };
        self.spawns.get(index).cloned()
    }

    /// Adds a player to the roster.
    ///
    /// The player's inventory and game mode are persisted before
    /// anything about them changes; if that fails the join is aborted.
    /// If a later host call fails the player is put back the way they
    /// were.
    ///
    /// A snapshot still stored from a round the process died in is
    /// applied first, so the new snapshot records the player's real
    /// belongings rather than the cleared in-round inventory.
    pub(crate) fn add_player(
        &mut self,
        env: &mut Env<'_>,
        player: PlayerId,
        spawn: Option<usize>,
    ) -> Result<(), RoundError> {
        if !env.host.is_online(player) {
            return Err(RoundError::PlayerOffline(player));
        }
        if self.max_players > 0 && self.roster.len() >= self.max_players {
            return Err(RoundError::RoundFull(self.arena.clone()));
        }
        self.join_allowed()?;
        if self.roster.contains_key(&player) {
            return Err(RoundError::AlreadyInRound {
                player,
                arena: self.arena.clone(),
            });
        }
        let Some(spawn) = self.pick_spawn(spawn) else {
            return Err(RoundError::InvalidState(format!(
                "arena {} has no spawns",
                self.arena
            )));
        };

        if let Some(stale) = env.players.load_snapshot(player)? {
            warn!(%player, arena = %self.arena, "restoring snapshot left by an interrupted round before joining");
            env.host.set_inventory(player, stale.inventory)?;
            env.host.set_game_mode(player, stale.game_mode)?;
        }
        if env.players.pending_restore(player)?.is_some() {
            env.players.clear_restore(player)?;
        }

        let snapshot = PlayerSnapshot {
            inventory: env.host.inventory(player)?,
            game_mode: env.host.game_mode(player)?,
            location: env.host.location(player).ok(),
        };
        if let Err(e) = env.players.save_snapshot(player, &snapshot) {
            warn!(%player, arena = %self.arena, error = %e, "could not save snapshot, join aborted");
            return Err(e.into());
        }

        let spectating = self.stage.is_running() && self.spectate_on_join;
        let mode = if spectating {
            GameMode::Spectator
        } else {
            self.default_game_mode
        };

        let applied = (|| {
            env.host
                .set_inventory(player, snapshot.inventory.cleared())?;
            env.host.clear_effects(player)?;
            env.host.set_game_mode(player, mode)?;
            env.host.teleport(player, &spawn)
        })();
        if let Err(e) = applied {
            warn!(%player, arena = %self.arena, error = %e, "join failed, restoring player");
            if let Err(e) = env.host.set_inventory(player, snapshot.inventory.clone()) {
                warn!(%player, error = %e, "could not give back inventory after failed join");
            }
            if let Err(e) = env.host.set_game_mode(player, snapshot.game_mode) {
                warn!(%player, error = %e, "could not give back game mode after failed join");
            }
            if let Err(e) = env.players.remove_snapshot(player) {
                warn!(%player, error = %e, "could not remove snapshot after failed join");
            }
            return Err(e.into());
        }

        let name = env.host.player_name(player).unwrap_or_default();
        let mut participant = (self.factory)(player, &name);
        {
            let state = participant.state_mut();
            state.arena = Some(self.arena.clone());
            state.spectating = spectating;
            state.previous_game_mode = Some(snapshot.game_mode);
            state.snapshot = Some(snapshot);
        }
        self.roster.insert(player, participant);

        env.events.emit(RoundEvent::PlayerJoined {
            round: self.key(),
            player,
        });
        info!(
            %player,
            arena = %self.arena,
            players = self.roster.len(),
            spectating,
            "player joined round"
        );

        if self.stage == Stage::Waiting
            && self.min_players > 0
            && self.roster.len() >= self.min_players
        {
            self.start(env)?;
        }
        Ok(())
    }

    /// Removes a player and gives them back their pre-round state.
    ///
    /// `exit` falls back to the round's exit location, then to where the
    /// player stood when they joined. An offline player is not touched;
    /// a pending restore is queued for their next connect instead.
    ///
    /// Every restore step is attempted. If any fails the player stays in
    /// the round with their snapshot stored, so the removal can be
    /// retried.
    pub(crate) fn remove_player(
        &mut self,
        env: &mut Env<'_>,
        player: PlayerId,
        exit: Option<Location>,
    ) -> Result<Box<dyn Participant>, RoundError> {
        let Some(participant) = self.roster.get(&player) else {
            return Err(RoundError::NotPresent(player));
        };
        let state = participant.state();
        let exit = exit
            .or_else(|| self.exit.clone())
            .or_else(|| state.snapshot.as_ref().and_then(|s| s.location.clone()));

        if env.host.is_online(player) {
            let mode = state
                .previous_game_mode
                .or(state.snapshot.as_ref().map(|s| s.game_mode));

            let mut failure: Option<HostError> = None;
            let mut check = |step: &str, result: Result<(), HostError>| {
                if let Err(e) = result {
                    warn!(%player, step, error = %e, "could not restore leaving player");
                    failure.get_or_insert(e);
                }
            };
            if let Some(mode) = mode {
                check("game mode", env.host.set_game_mode(player, mode));
            }
            if let Some(snapshot) = &state.snapshot {
                check("inventory", env.host.set_inventory(player, snapshot.inventory.clone()));
            }
            if let Some(exit) = &exit {
                check("teleport", env.host.teleport(player, exit));
            }
            if let Some(e) = failure {
                return Err(e.into());
            }
            if let Err(e) = env.players.remove_snapshot(player) {
                warn!(%player, error = %e, "could not remove restored snapshot");
            }
        } else if let Some(exit) = &exit {
            env.players.queue_restore(player, exit)?;
            debug!(%player, world = %exit.world, "player offline, restore queued");
        } else {
            warn!(%player, arena = %self.arena, "offline player has no exit location to restore to");
        }

        let Some(mut participant) = self.roster.remove(&player) else {
            return Err(RoundError::NotPresent(player));
        };
        detach(participant.as_mut());

        env.events.emit(RoundEvent::PlayerLeft {
            round: self.key(),
            player,
        });
        info!(%player, arena = %self.arena, players = self.roster.len(), "player left round");
        Ok(participant)
    }
}

fn detach(participant: &mut dyn Participant) {
    let state = participant.state_mut();
    state.arena = None;
    state.spectating = false;
    state.previous_game_mode = None;
    state.snapshot = None;
    state.team = None;
}

impl std::fmt::Debug for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Round")
            .field("owner", &self.owner)
            .field("arena", &self.arena)
            .field("stage", &self.stage)
            .field("elapsed", &self.elapsed)
            .field("players", &self.roster.len())
            .finish_non_exhaustive()
    }
}
