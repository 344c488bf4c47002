//! Host event routing.
//!
//! The host calls these when something happens in the world; each
//! returns a [`Decision`] telling the host whether to let the action
//! through. Where an allowed action mutates an arena, the change is
//! logged for rollback before the host applies it.

use mglib_host::Host;
use mglib_player::Participant;
use mglib_round::{BlockAction, Round};
use mglib_types::{BlockPos, BlockState, Location, PlayerId};
use tracing::{debug, warn};

use crate::{Library, MgError};

/// Whether the host should let an action happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Cancel,
}

impl Decision {
    pub fn is_cancelled(self) -> bool {
        self == Self::Cancel
    }

    fn cancel_if(condition: bool) -> Self {
        if condition { Self::Cancel } else { Self::Allow }
    }
}

impl<H: Host> Library<H> {
    fn round_of(&self, player: PlayerId) -> Option<(&str, &Round)> {
        self.minigames().find_map(|mg| {
            mg.round_of(player).map(|round| (mg.owner(), round))
        })
    }

    /// Damage between entities. Either side may be a non-player.
    ///
    /// Spectators can neither deal nor take damage. Otherwise the
    /// attacker's round decides PvP when both sides are players, and the
    /// victim's round decides damage.
    pub fn on_damage(&self, attacker: Option<PlayerId>, victim: Option<PlayerId>) -> Decision {
        if let Some(attacker) = attacker {
            if let Some((_, round)) = self.round_of(attacker) {
                let spectating = round.participant(attacker).is_some_and(|p| p.is_spectating());
                if spectating || (victim.is_some() && !round.is_pvp_allowed()) {
                    return Decision::Cancel;
                }
            }
        }
        if let Some(victim) = victim {
            if let Some((_, round)) = self.round_of(victim) {
                let spectating = round.participant(victim).is_some_and(|p| p.is_spectating());
                if spectating || !round.is_damage_allowed() {
                    return Decision::Cancel;
                }
            }
        }
        Decision::Allow
    }

    /// A participant breaking a block.
    pub fn on_block_break(
        &mut self,
        player: PlayerId,
        world: &str,
        pos: BlockPos,
        previous: BlockState,
    ) -> Decision {
        self.player_block_change(player, BlockAction::Break, world, pos, previous)
    }

    /// A participant placing a block over `previous`.
    pub fn on_block_place(
        &mut self,
        player: PlayerId,
        world: &str,
        pos: BlockPos,
        previous: BlockState,
    ) -> Decision {
        self.player_block_change(player, BlockAction::Place, world, pos, previous)
    }

    /// Block changes by players outside any round are none of our
    /// business. Participants may only touch blocks while their round
    /// runs, not as spectators, and only if the minigame allows it.
    fn player_block_change(
        &mut self,
        player: PlayerId,
        action: BlockAction,
        world: &str,
        pos: BlockPos,
        previous: BlockState,
    ) -> Decision {
        let Some((owner, round)) = self.round_of(player) else {
            return Decision::Allow;
        };
        let spectating = round.participant(player).is_some_and(|p| p.is_spectating());
        let allowed = self
            .minigame(owner)
            .is_some_and(|mg| mg.block_rules().allows(action));
        if spectating || !round.is_running() || !allowed {
            return Decision::Cancel;
        }

        let (owner, arena) = (owner.to_string(), round.arena().to_string());
        if let Some(mg) = self.minigame_mut(&owner) {
            if let Err(e) = mg.log_block_change(&arena, world, pos, previous) {
                warn!(%owner, %arena, ?pos, error = %e, "could not log block change");
            }
        }
        Decision::Allow
    }

    /// A participant opening a container. Its contents are logged so
    /// anything taken or stored can be rolled back.
    pub fn on_container_access(&mut self, player: PlayerId, world: &str, pos: BlockPos) -> Decision {
        let Some((owner, round)) = self.round_of(player) else {
            return Decision::Allow;
        };
        if round.participant(player).is_some_and(|p| p.is_spectating()) {
            return Decision::Cancel;
        }
        let (owner, arena) = (owner.to_string(), round.arena().to_string());
        let Ok((minigame, env)) = self.context(&owner) else {
            return Decision::Allow;
        };
        if let Err(e) = minigame.log_inventory_change(&*env.host, &arena, world, pos) {
            warn!(%owner, %arena, ?pos, error = %e, "could not log container");
        }
        Decision::Allow
    }

    /// A block changing on its own: fire, melting, growth, liquid flow,
    /// physics, pistons, spreading.
    ///
    /// Cancelled in any world hosting an arena of a minigame whose
    /// rules forbid the action. When allowed, the change is logged for
    /// each running round in that world whose bounds (if any) contain
    /// the block.
    pub fn on_environment_block(
        &mut self,
        world: &str,
        pos: BlockPos,
        action: BlockAction,
        previous: BlockState,
    ) -> Decision {
        let mut to_log = Vec::new();
        for mg in self.minigames() {
            let hosts_arena = match mg.has_arena_in(world) {
                Ok(hosts) => hosts,
                Err(e) => {
                    warn!(owner = %mg.owner(), error = %e, "could not read arenas");
                    false
                }
            };
            if !hosts_arena {
                continue;
            }
            if !mg.block_rules().allows(action) {
                debug!(owner = %mg.owner(), %world, ?action, "environment change cancelled");
                return Decision::Cancel;
            }
            for round in mg.rounds() {
                let inside = round.bounds().is_none_or(|b| {
                    b.contains(f64::from(pos.x), f64::from(pos.y), f64::from(pos.z))
                });
                if round.world() == world && inside {
                    to_log.push((mg.owner().to_string(), round.arena().to_string()));
                }
            }
        }

        for (owner, arena) in to_log {
            if let Some(mg) = self.minigame_mut(&owner) {
                if let Err(e) = mg.log_block_change(&arena, world, pos, previous.clone()) {
                    warn!(%owner, %arena, ?pos, error = %e, "could not log environment change");
                }
            }
        }
        Decision::Allow
    }

    /// Any other interaction with the world. Spectators are ghosts.
    pub fn on_interact(&self, player: PlayerId) -> Decision {
        Decision::cancel_if(
            self.participant(player)
                .is_some_and(|p| p.is_spectating()),
        )
    }

    /// A participant being moved. Leaving the round's world or its
    /// bounds takes them out of the round, with `destination` as exit.
    pub fn on_teleport(&mut self, player: PlayerId, destination: &Location) -> Decision {
        let Some((_, round)) = self.round_of(player) else {
            return Decision::Allow;
        };
        let leaves = destination.world != round.world()
            || round
                .bounds()
                .is_some_and(|b| !b.contains_location(destination));
        if leaves {
            if let Err(e) = self.leave(player, Some(destination.clone())) {
                warn!(%player, error = %e, "could not remove player teleporting away");
            }
        }
        Decision::Allow
    }

    /// A player disconnected. Their participant is removed and, since
    /// the host no longer sees them online, a restore to the minigame's
    /// default exit is queued for their next connect.
    pub fn on_quit(&mut self, player: PlayerId) -> Result<(), MgError> {
        let Some(minigame) = self.minigame_of(player) else {
            return Ok(());
        };
        let exit = minigame.exit_location().cloned();
        self.leave(player, exit)?;
        Ok(())
    }

    /// A player connected. Applies any restore queued when they quit
    /// mid-round, or a snapshot left by a round the process died in.
    /// Returns `true` if one was applied.
    pub fn on_join(&mut self, player: PlayerId) -> Result<bool, MgError> {
        self.reconcile(player)
    }
}
