//! Async tick driver.
//!
//! Hosts that already have a tick thread call
//! [`Library::advance_tick`] from it and never touch this module.
//! Everyone else runs the library on a Tokio task: a
//! [`TickScheduler`] produces 20 game ticks per second and each one
//! advances the library under its mutex.

use std::future::Future;
use std::sync::Arc;

use mglib_host::Host;
use mglib_tick::{TickConfig, TickScheduler};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::Library;

/// A library shared between the tick driver and whatever feeds it
/// host events.
pub type SharedLibrary<H> = Arc<Mutex<Library<H>>>;

/// Wraps a library for sharing with the driver.
pub fn share<H: Host>(library: Library<H>) -> SharedLibrary<H> {
    Arc::new(Mutex::new(library))
}

/// Drives `library` until `shutdown` resolves. Returns the number of
/// game ticks run.
///
/// The lock is held only while one tick is processed, so event
/// handlers interleave between ticks.
pub async fn run_until<H: Host>(
    library: SharedLibrary<H>,
    config: TickConfig,
    shutdown: impl Future<Output = ()>,
) -> u64 {
    let mut scheduler = TickScheduler::new(config);
    info!(rate_hz = scheduler.tick_rate_hz(), "tick driver running");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            info = scheduler.wait_for_tick() => {
                let ticked = {
                    let mut library = library.lock().await;
                    library.advance_tick()
                };
                if ticked > 0 {
                    debug!(tick = info.tick, rounds = ticked, "rounds ticked");
                }
                scheduler.record_tick_end();
            }
            () = &mut shutdown => {
                info!(ticks = scheduler.tick_count(), "tick driver stopped");
                return scheduler.tick_count();
            }
        }
    }
}

/// Drives `library` forever.
pub async fn run<H: Host>(library: SharedLibrary<H>, config: TickConfig) {
    run_until(library, config, std::future::pending()).await;
}

/// Spawns [`run_until`] on the current runtime.
pub fn spawn<H: Host>(
    library: SharedLibrary<H>,
    config: TickConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> JoinHandle<u64> {
    tokio::spawn(run_until(library, config, shutdown))
}
