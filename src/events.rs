//! Control-loop event queue.
//!
//! Events are produced by the [`TickScheduler`](crate::scheduler::TickScheduler)
//! when a periodic deadline passes, and consumed by the main control loop,
//! which processes them one at a time in FIFO order.
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ TickScheduler │────▶│  EventQueue  │────▶│  Main Loop   │
//! │ (deadlines)   │     │  (owned)     │     │  (consumer)  │
//! └───────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Rotary input and remote setpoint commands do not pass through here;
//! they arrive on their own channels (see [`crate::app::channels`]).

use heapless::Deque;
use log::warn;

use crate::app::ports::SchedulerDelegate;

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 16;

/// Periodic work items, one per scheduled activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Sample sensors and run one controller update.
    ControlTick       = 0,
    /// Redraw the local screen.
    UiRefresh         = 10,
    /// Hand a telemetry sample to the uplink worker.
    TelemetryTick     = 20,
    /// Re-read the stored setpoint and repair it if needed.
    StoreMaintenance  = 30,
}

/// Owned FIFO of pending [`Event`]s.
pub struct EventQueue {
    pending: Deque<Event, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            pending: Deque::new(),
            dropped: 0,
        }
    }

    /// Enqueue an event. Returns `false` if the queue is full (event dropped).
    pub fn push(&mut self, event: Event) -> bool {
        if self.pending.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("EventQueue full, dropped {:?} ({} total)", event, self.dropped);
            return false;
        }
        true
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.pending.pop_front()
    }

    /// Drain all pending events into a handler, oldest first.
    pub fn drain(&mut self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Events lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl SchedulerDelegate for EventQueue {
    fn on_due(&mut self, event: Event) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = EventQueue::new();
        q.push(Event::UiRefresh);
        q.push(Event::ControlTick);
        assert_eq!(q.pop(), Some(Event::UiRefresh));
        assert_eq!(q.pop(), Some(Event::ControlTick));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn overflow_drops_and_counts() {
        let mut q = EventQueue::new();
        for _ in 0..EVENT_QUEUE_CAP {
            assert!(q.push(Event::ControlTick));
        }
        assert!(!q.push(Event::TelemetryTick));
        assert_eq!(q.dropped(), 1);
        assert_eq!(q.len(), EVENT_QUEUE_CAP);
    }

    #[test]
    fn drain_empties_queue() {
        let mut q = EventQueue::new();
        q.on_due(Event::StoreMaintenance);
        q.on_due(Event::TelemetryTick);
        let mut seen = Vec::new();
        q.drain(|e| seen.push(e));
        assert_eq!(seen, vec![Event::StoreMaintenance, Event::TelemetryTick]);
        assert!(q.is_empty());
    }
}
