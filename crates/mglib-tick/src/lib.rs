//! Timing for MGLib.
//!
//! Two layers live here:
//!
//! - [`TickClock`] counts game ticks and implements [`Scheduler`], the
//!   "run this every N ticks, give me a handle I can cancel" contract a
//!   round uses for its once-per-second timer. It is a pure counter: no
//!   threads, no wall clock, so tests drive it one tick at a time.
//! - [`TickScheduler`] produces those game ticks from wall-clock time at
//!   a fixed rate (20 Hz by default), with overrun handling and budget
//!   warnings. It sits inside the async driver's loop:
//!
//! ```ignore
//! loop {
//!     let info = scheduler.wait_for_tick().await;
//!     library.lock().await.advance_tick();
//!     scheduler.record_tick_end();
//! }
//! ```

mod clock;
mod scheduler;

pub use clock::{Scheduler, TaskHandle, TickClock};
pub use scheduler::{TickConfig, TickInfo, TickPolicy, TickScheduler};

/// Game ticks per second of round time. Round timers are scheduled with
/// this period.
pub const TICKS_PER_SECOND: u32 = 20;
