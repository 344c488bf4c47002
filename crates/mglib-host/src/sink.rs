//! Notification sinks.

use mglib_types::RoundEvent;
use tokio::sync::mpsc;

/// Receives [`RoundEvent`]s as the core emits them.
///
/// Delivery is synchronous and fire-and-forget: `emit` has no return
/// value and must not call back into the round that emitted.
pub trait EventSink: Send + 'static {
    fn emit(&mut self, event: RoundEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: RoundEvent) {}
}

/// Collects events in memory, in emission order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RoundEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far.
    pub fn events(&self) -> &[RoundEvent] {
        &self.events
    }

    /// Takes the collected events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    /// Counts events matching a predicate.
    pub fn count(&self, pred: impl Fn(&RoundEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: RoundEvent) {
        self.events.push(event);
    }
}

/// Forwards events into an unbounded Tokio channel.
///
/// Sending never blocks. If the receiver is gone the event is dropped,
/// the same way a round keeps going when nobody listens.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RoundEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver listeners read from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RoundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: RoundEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped, discarding notification");
        }
    }
}
