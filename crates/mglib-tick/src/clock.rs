//! Game-tick task scheduling.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

/// Opaque handle to a scheduled repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// The host's periodic-callback facility, as the core sees it.
///
/// A scheduler only hands out handles and reports which ones are due.
/// Mapping a handle back to the round that owns it is the caller's job,
/// so no callback ever captures round state.
pub trait Scheduler: Send + 'static {
    /// Schedules a task that first fires on the next tick and then every
    /// `period_ticks` ticks. A period of 0 is treated as 1.
    fn schedule_repeating(&mut self, period_ticks: u32) -> TaskHandle;

    /// Cancels a task. Returns `false` if it was not scheduled, so
    /// cancelling twice is harmless.
    fn cancel(&mut self, handle: TaskHandle) -> bool;

    /// Returns `true` while the task is scheduled.
    fn is_scheduled(&self, handle: TaskHandle) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Task {
    period: u64,
    next_due: u64,
}

/// Counts game ticks and tracks repeating tasks.
///
/// ```
/// use mglib_tick::{Scheduler, TickClock};
///
/// let mut clock = TickClock::new();
/// let handle = clock.schedule_repeating(2);
/// assert_eq!(clock.advance(), vec![handle]); // fires on the next tick
/// assert!(clock.advance().is_empty());
/// assert_eq!(clock.advance(), vec![handle]);
/// ```
#[derive(Debug, Default)]
pub struct TickClock {
    now: u64,
    next_id: u64,
    tasks: BTreeMap<TaskHandle, Task>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks advanced so far.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advances one tick and returns the tasks due on it, in the order
    /// they were scheduled. Each returned task is rescheduled one period
    /// later before this returns.
    ///
    /// Callers should check [`Scheduler::is_scheduled`] before running
    /// each handle: running one task may cancel another in the same batch.
    pub fn advance(&mut self) -> Vec<TaskHandle> {
        self.now += 1;
        let now = self.now;
        let mut due = Vec::new();
        for (handle, task) in self.tasks.iter_mut() {
            if task.next_due <= now {
                task.next_due = now + task.period;
                due.push(*handle);
            }
        }
        if !due.is_empty() {
            trace!(tick = now, due = due.len(), "tasks due");
        }
        due
    }

    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Scheduler for TickClock {
    fn schedule_repeating(&mut self, period_ticks: u32) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.tasks.insert(
            handle,
            Task {
                period: u64::from(period_ticks.max(1)),
                next_due: self.now + 1,
            },
        );
        trace!(%handle, period_ticks, "task scheduled");
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        let removed = self.tasks.remove(&handle).is_some();
        if removed {
            trace!(%handle, "task cancelled");
        }
        removed
    }

    fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle)
    }
}
