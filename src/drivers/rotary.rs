//! ISR front end for the rotary encoder and its push switch.
//!
//! ## Hardware
//!
//! Quadrature encoder with pull-ups on A and B, plus an active-low push
//! switch. A rising edge on A is one detent; the level of B at that
//! moment gives the direction (low = clockwise). A falling edge on SW is
//! a press.
//!
//! ## ISR contract
//!
//! The GPIO handlers call [`RotaryInput::on_encoder_edge`] and
//! [`RotaryInput::on_switch_edge`] with a millisecond timestamp. Each
//! input has its own debounce window; edges inside it are ignored.
//! Accepted edges become [`RotaryEvent`]s on the [`RotaryQueue`] via
//! `try_send`, so the handler never blocks. A full queue drops the event.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::app::channels::RotaryQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotaryKind {
    Turn { clockwise: bool },
    Press,
}

/// One debounced input event, stamped with the ISR time (ms since boot,
/// truncated to u32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotaryEvent {
    pub kind: RotaryKind,
    pub at_ms: u32,
}

pub struct RotaryInput {
    queue: &'static RotaryQueue,
    debounce_ms: u32,
    last_turn_ms: AtomicU32,
    last_press_ms: AtomicU32,
    dropped: AtomicU32,
}

impl RotaryInput {
    pub fn new(queue: &'static RotaryQueue, debounce_ms: u32) -> Self {
        // Seed one window in the past so an edge at t = 0 is accepted.
        let seed = 0u32.wrapping_sub(debounce_ms);
        Self {
            queue,
            debounce_ms,
            last_turn_ms: AtomicU32::new(seed),
            last_press_ms: AtomicU32::new(seed),
            dropped: AtomicU32::new(0),
        }
    }

    /// Rising edge on A. Returns `true` if an event was queued.
    pub fn on_encoder_edge(&self, b_low: bool, now_ms: u32) -> bool {
        if !Self::admit(&self.last_turn_ms, now_ms, self.debounce_ms) {
            return false;
        }
        self.push(RotaryEvent {
            kind: RotaryKind::Turn { clockwise: b_low },
            at_ms: now_ms,
        })
    }

    /// Falling edge on SW. Returns `true` if an event was queued.
    pub fn on_switch_edge(&self, now_ms: u32) -> bool {
        if !Self::admit(&self.last_press_ms, now_ms, self.debounce_ms) {
            return false;
        }
        self.push(RotaryEvent {
            kind: RotaryKind::Press,
            at_ms: now_ms,
        })
    }

    /// Events lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn queue(&self) -> &'static RotaryQueue {
        self.queue
    }

    fn admit(last: &AtomicU32, now_ms: u32, debounce_ms: u32) -> bool {
        let prev = last.load(Ordering::Acquire);
        if now_ms.wrapping_sub(prev) < debounce_ms {
            return false;
        }
        last.store(now_ms, Ordering::Release);
        true
    }

    fn push(&self, event: RotaryEvent) -> bool {
        if self.queue.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::channels::{leak, ROTARY_DEPTH};
    use embassy_sync::channel::Channel;

    fn input() -> RotaryInput {
        RotaryInput::new(leak(Channel::new()), 200)
    }

    #[test]
    fn direction_follows_b_level() {
        let rot = input();
        assert!(rot.on_encoder_edge(true, 1_000));
        assert!(rot.on_encoder_edge(false, 1_300));

        let q = rot.queue();
        assert_eq!(
            q.try_receive().ok(),
            Some(RotaryEvent { kind: RotaryKind::Turn { clockwise: true }, at_ms: 1_000 })
        );
        assert_eq!(
            q.try_receive().ok(),
            Some(RotaryEvent { kind: RotaryKind::Turn { clockwise: false }, at_ms: 1_300 })
        );
    }

    #[test]
    fn edges_inside_window_are_ignored_per_input() {
        let rot = input();
        assert!(rot.on_encoder_edge(true, 1_000));
        assert!(!rot.on_encoder_edge(true, 1_150));
        // The switch has its own window.
        assert!(rot.on_switch_edge(1_150));
        assert!(!rot.on_switch_edge(1_349));
        assert!(rot.on_switch_edge(1_350));
        assert_eq!(rot.queue().len(), 3);
    }

    #[test]
    fn first_edge_after_boot_is_accepted() {
        let rot = input();
        assert!(rot.on_switch_edge(0));
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let rot = input();
        for i in 0..ROTARY_DEPTH as u32 {
            assert!(rot.on_switch_edge(1_000 + i * 200));
        }
        assert!(!rot.on_switch_edge(1_000 + ROTARY_DEPTH as u32 * 200));
        assert_eq!(rot.dropped(), 1);
    }
}
