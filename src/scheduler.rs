//! Deadline scheduler for the periodic activities.
//!
//! Each activity has a first deadline and a period, measured on the
//! monotonic millisecond clock. The scheduler notifies a
//! [`SchedulerDelegate`] when a deadline passes; the main loop passes
//! its [`EventQueue`](crate::events::EventQueue) as the delegate.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ControlTick 500 ms   UiRefresh 1 s   TelemetryTick 60 s     │
//! │  StoreMaintenance: first 5 s, then 50 s                      │
//! │              │               │               │               │
//! │              ▼               ▼               ▼               │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate::on_due                 │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │        AppService.tick() / ui.refresh() / uplink / store     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A late poll fires each overdue activity once and re-bases its next
//! deadline on the current time, so a stalled loop never produces a burst
//! of catch-up events.

use log::{debug, info};

use crate::app::ports::SchedulerDelegate;
use crate::config::SystemConfig;
use crate::events::Event;

/// Maximum number of scheduled activities (stack-allocated).
const MAX_ENTRIES: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Entry {
    event: Event,
    period_ms: u64,
    next_due_ms: u64,
}

pub struct TickScheduler {
    entries: heapless::Vec<Entry, MAX_ENTRIES>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// The four standard activities, with deadlines relative to `now_ms`.
    pub fn from_config(config: &SystemConfig, now_ms: u64) -> Self {
        let mut sched = Self::new();
        let control = u64::from(config.control_interval_ms);
        let ui = u64::from(config.ui_refresh_ms);
        let telemetry = u64::from(config.telemetry_interval_ms);
        let store_first = u64::from(config.store_first_check_ms);
        let store = u64::from(config.store_check_interval_ms);

        sched.add(Event::ControlTick, now_ms + control, control);
        sched.add(Event::UiRefresh, now_ms + ui, ui);
        sched.add(Event::TelemetryTick, now_ms + telemetry, telemetry);
        sched.add(Event::StoreMaintenance, now_ms + store_first, store);
        sched
    }

    /// Add an activity. Returns `false` if all slots are taken.
    pub fn add(&mut self, event: Event, first_due_ms: u64, period_ms: u64) -> bool {
        let entry = Entry {
            event,
            period_ms: period_ms.max(1),
            next_due_ms: first_due_ms,
        };
        if self.entries.push(entry).is_err() {
            return false;
        }
        info!(
            "Scheduler: {:?} first at {} ms, every {} ms",
            event, first_due_ms, period_ms
        );
        true
    }

    /// Fire every activity whose deadline is at or before `now_ms`.
    pub fn poll(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.entries.iter_mut() {
            if now_ms < entry.next_due_ms {
                continue;
            }
            let late_ms = now_ms - entry.next_due_ms;
            if late_ms >= entry.period_ms {
                debug!("Scheduler: {:?} late by {} ms", entry.event, late_ms);
                entry.next_due_ms = now_ms + entry.period_ms;
            } else {
                entry.next_due_ms += entry.period_ms;
            }
            delegate.on_due(entry.event);
        }
    }

    /// Milliseconds until the earliest pending deadline (0 if already due).
    pub fn time_to_next(&self, now_ms: u64) -> Option<u64> {
        self.entries
            .iter()
            .map(|e| e.next_due_ms.saturating_sub(now_ms))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingDelegate {
        fires: Vec<Event>,
    }

    impl SchedulerDelegate for RecordingDelegate {
        fn on_due(&mut self, event: Event) {
            self.fires.push(event);
        }
    }

    fn count(d: &RecordingDelegate, e: Event) -> usize {
        d.fires.iter().filter(|&&f| f == e).count()
    }

    #[test]
    fn standard_cadences_over_two_minutes() {
        let config = SystemConfig::default();
        let mut sched = TickScheduler::from_config(&config, 0);
        let mut d = RecordingDelegate { fires: Vec::new() };

        let mut now = 0;
        while now <= 120_000 {
            sched.poll(now, &mut d);
            now += 100;
        }

        assert_eq!(count(&d, Event::ControlTick), 240);
        assert_eq!(count(&d, Event::UiRefresh), 120);
        assert_eq!(count(&d, Event::TelemetryTick), 2);
        // 5 s, 55 s, 105 s
        assert_eq!(count(&d, Event::StoreMaintenance), 3);
    }

    #[test]
    fn store_maintenance_first_fire_at_five_seconds() {
        let config = SystemConfig::default();
        let mut sched = TickScheduler::from_config(&config, 0);
        let mut d = RecordingDelegate { fires: Vec::new() };

        sched.poll(4_999, &mut d);
        assert_eq!(count(&d, Event::StoreMaintenance), 0);
        sched.poll(5_000, &mut d);
        assert_eq!(count(&d, Event::StoreMaintenance), 1);
    }

    #[test]
    fn stall_fires_once_and_rebases() {
        let mut sched = TickScheduler::new();
        sched.add(Event::ControlTick, 500, 500);
        let mut d = RecordingDelegate { fires: Vec::new() };

        sched.poll(10_000, &mut d);
        assert_eq!(d.fires.len(), 1);
        assert_eq!(sched.time_to_next(10_000), Some(500));
    }

    #[test]
    fn time_to_next_reports_earliest() {
        let mut sched = TickScheduler::new();
        sched.add(Event::TelemetryTick, 60_000, 60_000);
        sched.add(Event::ControlTick, 500, 500);
        assert_eq!(sched.time_to_next(200), Some(300));
        assert_eq!(TickScheduler::new().time_to_next(0), None);
    }
}
