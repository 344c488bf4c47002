//! Applying leftover records when a player connects.

use mglib_host::{Host, HostError};
use mglib_types::{Location, PlayerId};
use tracing::{info, warn};

use crate::{PlayerSnapshot, PlayerStore, StoreError};

/// Restores a connecting player from whatever an earlier session left
/// in the store. Only call this for a player who is in no round.
///
/// Two cases are handled:
///
/// - A pending restore is queued: the player left a round while
///   offline. Their pre-round snapshot (when one is stored) is applied
///   and they are teleported to the queued exit location.
/// - Only a snapshot is stored: the process died while the player was
///   in a round. The snapshot is applied and the player is sent back
///   to where they stood when they joined, if that is known.
///
/// Both records are cleared afterwards. Returns `Ok(true)` if anything
/// was applied.
///
/// Host failures are logged and leave the records in place so the next
/// connect tries again. Store failures are returned.
pub fn reconcile(
    host: &mut dyn Host,
    store: &mut dyn PlayerStore,
    player: PlayerId,
) -> Result<bool, StoreError> {
    if !host.is_online(player) {
        return Ok(false);
    }
    let pending = store.pending_restore(player)?;
    let snapshot = store.load_snapshot(player)?;
    let exit = match (&pending, &snapshot) {
        (Some(exit), _) => Some(exit.clone()),
        (None, Some(snapshot)) => snapshot.location.clone(),
        (None, None) => return Ok(false),
    };

    if let Err(e) = apply(host, player, snapshot.as_ref(), exit.as_ref()) {
        warn!(%player, error = %e, "could not restore player, keeping records");
        return Ok(false);
    }

    store.remove_snapshot(player)?;
    if pending.is_some() {
        store.clear_restore(player)?;
        info!(%player, "pending restore applied");
    } else {
        info!(%player, "snapshot from an interrupted round restored");
    }
    Ok(true)
}

fn apply(
    host: &mut dyn Host,
    player: PlayerId,
    snapshot: Option<&PlayerSnapshot>,
    exit: Option<&Location>,
) -> Result<(), HostError> {
    if let Some(snapshot) = snapshot {
        host.set_inventory(player, snapshot.inventory.clone())?;
        host.set_game_mode(player, snapshot.game_mode)?;
    }
    if let Some(exit) = exit {
        host.teleport(player, exit)?;
    }
    Ok(())
}
