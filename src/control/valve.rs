//! Valve sub-state shared between the control task and the auto-close timer.
//!
//! ```text
//!   Controller::update ──┐
//!                        ├──▶ Mutex<ValveState> ──▶ ValveOutput (GPIO)
//!   auto-close expiry ───┘
//! ```
//!
//! This mutex is the only lock held across execution contexts. Every
//! transition goes through [`ValveState::open`] / [`ValveState::close`],
//! which update the bookkeeping only after the output accepted the
//! command, so `open` always matches the last successful write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::app::ports::ValveOutput;
use crate::error::ActuatorError;

pub struct ValveState {
    output: Box<dyn ValveOutput + Send>,
    open: bool,
    open_since_ms: Option<u64>,
    /// `None` until the first close, so the first opening after boot is
    /// not held back by the cooldown.
    last_closed_at_ms: Option<u64>,
}

impl ValveState {
    pub fn new(output: Box<dyn ValveOutput + Send>) -> Self {
        Self {
            output,
            open: false,
            open_since_ms: None,
            last_closed_at_ms: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open_since_ms(&self) -> Option<u64> {
        self.open_since_ms
    }

    pub fn last_closed_at_ms(&self) -> Option<u64> {
        self.last_closed_at_ms
    }

    /// Time left before the valve may reopen, `None` if it may open now.
    pub fn cooldown_remaining(&self, now_ms: u64, cooldown_ms: u32) -> Option<u64> {
        let closed_at = self.last_closed_at_ms?;
        let elapsed = now_ms.saturating_sub(closed_at);
        let cooldown = u64::from(cooldown_ms);
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    /// Open the valve. Returns `Ok(false)` if it was already open.
    pub fn open(&mut self, now_ms: u64) -> Result<bool, ActuatorError> {
        if self.open {
            return Ok(false);
        }
        self.output.set_open(true)?;
        self.open = true;
        self.open_since_ms = Some(now_ms);
        Ok(true)
    }

    /// Close the valve. Returns `Ok(false)` if it was already closed.
    pub fn close(&mut self, now_ms: u64) -> Result<bool, ActuatorError> {
        if !self.open {
            return Ok(false);
        }
        self.output.set_open(false)?;
        self.open = false;
        self.open_since_ms = None;
        self.last_closed_at_ms = Some(now_ms);
        Ok(true)
    }
}

/// Cloneable handle to the one [`ValveState`].
#[derive(Clone)]
pub struct SharedValve(Arc<Mutex<ValveState>>);

impl SharedValve {
    pub fn new(output: impl ValveOutput + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(ValveState::new(Box::new(output)))))
    }

    /// Lock the valve sub-state. A panic while holding the lock cannot
    /// leave the bookkeeping half-written, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, ValveState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    /// Auto-close timer expiry. Closes the valve if it is still open.
    pub fn expire(&self, now_ms: u64) {
        let mut valve = self.lock();
        let opened = valve.open_since_ms();
        match valve.close(now_ms) {
            Ok(true) => info!(
                "VALVE | auto-closed after {} ms",
                opened.map_or(0, |t| now_ms.saturating_sub(t))
            ),
            Ok(false) => {}
            Err(e) => warn!("VALVE | auto-close failed: {}", e),
        }
    }
}
