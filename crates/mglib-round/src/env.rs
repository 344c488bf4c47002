//! The collaborators a round operation needs.

use mglib_host::{EventSink, Host};
use mglib_player::PlayerStore;
use mglib_tick::Scheduler;

/// Mutable access to the host-side collaborators, passed into every
/// round operation that has side effects.
///
/// The top-level `Library` builds one by split
/// borrowing its own fields; tests build one from local test doubles.
pub struct Env<'a> {
    pub host: &'a mut dyn Host,
    pub scheduler: &'a mut dyn Scheduler,
    pub events: &'a mut dyn EventSink,
    pub players: &'a mut dyn PlayerStore,
}

impl<'a> Env<'a> {
    pub fn new(
        host: &'a mut dyn Host,
        scheduler: &'a mut dyn Scheduler,
        events: &'a mut dyn EventSink,
        players: &'a mut dyn PlayerStore,
    ) -> Self {
        Self {
            host,
            scheduler,
            events,
            players,
        }
    }
}
