//! The library context: every registered minigame plus the host-side
//! collaborators they share.

use std::collections::BTreeMap;

use mglib_host::{EventSink, Host};
use mglib_player::{reconcile, Participant, PlayerStore};
use mglib_rollback::RollbackStore;
use mglib_round::{ArenaStore, Env, Minigame, MinigameConfig};
use mglib_tick::{Scheduler, TickClock};
use mglib_types::{Location, PlayerId};
use tracing::{error, info, warn};

use crate::MgError;

/// One process-wide context owning every minigame's state.
///
/// There is no global registry: whoever embeds the library creates a
/// `Library`, registers minigames on it and routes host events and game
/// ticks into it. Several independent libraries can coexist, which is
/// what the tests do.
///
/// All mutation goes through `&mut self`, so callers sharing one across
/// tasks wrap it in a mutex (see [`driver`](crate::driver)).
pub struct Library<H: Host> {
    minigames: BTreeMap<String, Minigame>,
    host: H,
    clock: TickClock,
    events: Box<dyn EventSink>,
    players: Box<dyn PlayerStore>,
}

impl<H: Host> Library<H> {
    pub fn new(host: H, events: impl EventSink, players: impl PlayerStore) -> Self {
        Self {
            minigames: BTreeMap::new(),
            host,
            clock: TickClock::new(),
            events: Box::new(events),
            players: Box::new(players),
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Registers a minigame under `owner` and replays any rollback logs
    /// it left behind last time.
    pub fn register(
        &mut self,
        owner: &str,
        config: MinigameConfig,
        arenas: Box<dyn ArenaStore>,
        rollback: Box<dyn RollbackStore>,
    ) -> Result<&mut Minigame, MgError> {
        self.register_minigame(Minigame::new(owner, config, arenas, rollback))
    }

    /// Registers a fully built minigame, e.g. one with a custom
    /// participant factory.
    pub fn register_minigame(&mut self, minigame: Minigame) -> Result<&mut Minigame, MgError> {
        let owner = minigame.owner().to_string();
        if self.minigames.contains_key(&owner) {
            return Err(MgError::MinigameExists(owner));
        }
        self.minigames.insert(owner.clone(), minigame);

        let (minigame, mut env) = self.context(&owner)?;
        let recovered = minigame.check_rollbacks(&mut env)?;
        info!(%owner, recovered = recovered.len(), "minigame registered");
        self.minigame_mut(&owner)
            .ok_or(MgError::MinigameNotFound(owner))
    }

    /// Ends every round of `owner` and removes it from the library.
    pub fn unregister(&mut self, owner: &str) -> Result<Minigame, MgError> {
        let (minigame, mut env) = self.context(owner)?;
        let arenas: Vec<String> = minigame.rounds().map(|r| r.arena().to_string()).collect();
        for arena in arenas {
            if let Err(e) = minigame.destroy_round(&mut env, &arena) {
                warn!(%owner, %arena, error = %e, "could not destroy round while unregistering");
            }
        }
        info!(%owner, "minigame unregistered");
        self.minigames
            .remove(owner)
            .ok_or_else(|| MgError::MinigameNotFound(owner.to_string()))
    }

    pub fn minigame(&self, owner: &str) -> Option<&Minigame> {
        self.minigames.get(owner)
    }

    pub fn minigame_mut(&mut self, owner: &str) -> Option<&mut Minigame> {
        self.minigames.get_mut(owner)
    }

    pub fn minigames(&self) -> impl Iterator<Item = &Minigame> {
        self.minigames.values()
    }

    /// `owner`'s minigame together with an [`Env`] over this library's
    /// collaborators, for calling side-effecting minigame operations.
    ///
    /// ```ignore
    /// let (spleef, mut env) = library.context("spleef")?;
    /// spleef.add_player(&mut env, "field", player, None)?;
    /// ```
    pub fn context(&mut self, owner: &str) -> Result<(&mut Minigame, Env<'_>), MgError> {
        let minigame = self
            .minigames
            .get_mut(owner)
            .ok_or_else(|| MgError::MinigameNotFound(owner.to_string()))?;
        let env = Env::new(
            &mut self.host,
            &mut self.clock,
            self.events.as_mut(),
            self.players.as_mut(),
        );
        Ok((minigame, env))
    }

    // -----------------------------------------------------------------------
    // Collaborators
    // -----------------------------------------------------------------------

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn players(&self) -> &dyn PlayerStore {
        self.players.as_ref()
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// The minigame `player` is playing, if any.
    pub fn minigame_of(&self, player: PlayerId) -> Option<&Minigame> {
        self.minigames.values().find(|mg| mg.is_participant(player))
    }

    pub fn participant(&self, player: PlayerId) -> Option<&dyn Participant> {
        self.minigames.values().find_map(|mg| mg.participant(player))
    }

    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.minigame_of(player).is_some()
    }

    /// Adds `player` to `owner`'s round on `arena`.
    ///
    /// A player can be in one round across all minigames.
    pub fn join(
        &mut self,
        owner: &str,
        arena: &str,
        player: PlayerId,
        spawn: Option<usize>,
    ) -> Result<(), MgError> {
        if let Some(current) = self.minigame_of(player) {
            if current.owner() != owner {
                let arena = current
                    .round_of(player)
                    .map(|r| r.arena().to_string())
                    .unwrap_or_default();
                return Err(mglib_round::RoundError::AlreadyInRound { player, arena }.into());
            }
        }
        let (minigame, mut env) = self.context(owner)?;
        Ok(minigame.add_player(&mut env, arena, player, spawn)?)
    }

    /// Removes `player` from whatever round they are in.
    pub fn leave(
        &mut self,
        player: PlayerId,
        exit: Option<Location>,
    ) -> Result<Box<dyn Participant>, MgError> {
        let owner = self
            .minigame_of(player)
            .map(|mg| mg.owner().to_string())
            .ok_or(mglib_round::RoundError::NotPresent(player))?;
        let (minigame, mut env) = self.context(&owner)?;
        Ok(minigame.remove_player(&mut env, player, exit)?)
    }

    pub fn start_round(&mut self, owner: &str, arena: &str) -> Result<(), MgError> {
        let (minigame, mut env) = self.context(owner)?;
        Ok(minigame.start_round(&mut env, arena)?)
    }

    pub fn end_round(&mut self, owner: &str, arena: &str) -> Result<bool, MgError> {
        let (minigame, mut env) = self.context(owner)?;
        Ok(minigame.end_round(&mut env, arena, false)?)
    }

    /// Restores a player who just connected from records an earlier
    /// session left behind: a queued offline restore, or a snapshot
    /// from a round the process died in. Participants are left alone.
    pub fn reconcile(&mut self, player: PlayerId) -> Result<bool, MgError> {
        if self.is_participant(player) {
            return Ok(false);
        }
        Ok(reconcile(&mut self.host, self.players.as_mut(), player)?)
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advances game time by one tick and runs every round timer that
    /// fell due. Returns the number of rounds ticked.
    ///
    /// Timers are plain handles; the round owning each one is found by
    /// scanning. A round that ends during this tick cancels its handle,
    /// so a handle no longer scheduled by the time it comes up is
    /// skipped.
    pub fn advance_tick(&mut self) -> usize {
        let due = self.clock.advance();
        let mut ticked = 0;
        for handle in due {
            if !self.clock.is_scheduled(handle) {
                continue;
            }
            let owner_arena = self.minigames.iter().find_map(|(owner, mg)| {
                mg.arena_for_timer(handle)
                    .map(|arena| (owner.clone(), arena.to_string()))
            });
            let Some((owner, arena)) = owner_arena else {
                warn!(%handle, "timer has no round, cancelling");
                self.clock.cancel(handle);
                continue;
            };

            let Ok((minigame, mut env)) = self.context(&owner) else {
                continue;
            };
            if let Err(e) = minigame.tick_round(&mut env, &arena) {
                error!(%owner, %arena, error = %e, "round tick failed");
            }
            ticked += 1;
        }
        ticked
    }
}

impl<H: Host> std::fmt::Debug for Library<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("minigames", &self.minigames.keys().collect::<Vec<_>>())
            .field("tick", &self.clock.now())
            .finish_non_exhaustive()
    }
}
