//! Inter-task channels.
//!
//! `embassy-sync` bounded MPMC channels bridge the rotary ISR, the uplink
//! worker and the control loop. They are created once at boot and handed
//! to producer and consumer by reference, never reached through globals.
//!
//! ```text
//! ┌────────────┐ RotaryEvent  ┌──────────────┐ TelemetrySample ┌──────────┐
//! │ GPIO ISRs  │─────────────▶│ Control Loop │────────────────▶│  Uplink  │
//! └────────────┘              │              │◀────────────────│  worker  │
//!                             └──────────────┘   AppCommand    └──────────┘
//! ```
//!
//! Every producer uses `try_send`: the ISR cannot block, and a slow
//! uplink must not stall the control loop. A full channel drops the
//! newest item.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::drivers::rotary::RotaryEvent;

use super::commands::AppCommand;
use super::events::TelemetrySample;

/// Rotary events buffered between ISR and control loop.
pub const ROTARY_DEPTH: usize = 32;

/// Telemetry samples waiting for the uplink worker.
pub const TELEMETRY_DEPTH: usize = 2;

/// Commands parsed from telemetry responses.
pub const COMMAND_DEPTH: usize = 4;

/// Rotary encoder ISR → control loop.
pub type RotaryQueue = Channel<CriticalSectionRawMutex, RotaryEvent, ROTARY_DEPTH>;

/// Control loop → uplink worker.
pub type TelemetryChannel = Channel<CriticalSectionRawMutex, TelemetrySample, TELEMETRY_DEPTH>;

/// Uplink worker → control loop.
pub type CommandChannel = Channel<CriticalSectionRawMutex, AppCommand, COMMAND_DEPTH>;

/// Allocate a channel that lives for the rest of the program.
pub fn leak<T: 'static>(channel: T) -> &'static T {
    Box::leak(Box::new(channel))
}
