//! One-shot valve auto-close timer.
//!
//! On ESP-IDF this is a raw `esp_timer` one-shot. Its callback runs in the
//! ESP timer task (not an ISR), so it may take the valve mutex. On host
//! targets a sleeping thread stands in for the timer; a generation
//! counter cancels stale expiries.
//!
//! Either way the expiry calls [`SharedValve::expire`] with the current
//! monotonic time, independent of the control loop cadence.

use log::info;

use crate::app::ports::{Clock, ValveTimer};
use crate::control::valve::SharedValve;
use crate::error::ActuatorError;

/// What the expiry needs: the valve and a clock to stamp the close.
struct Expiry<C: Clock> {
    valve: SharedValve,
    clock: C,
}

impl<C: Clock> Expiry<C> {
    fn fire(&self) {
        self.valve.expire(self.clock.now_ms());
    }
}

// ── ESP-IDF: esp_timer one-shot ───────────────────────────────

#[cfg(target_os = "espidf")]
mod imp {
    use super::*;
    use esp_idf_svc::sys::*;

    pub struct AutoCloseTimer {
        handle: esp_timer_handle_t,
    }

    // SAFETY: the handle is only used through esp_timer_* calls, which are
    // thread-safe per the ESP-IDF documentation.
    unsafe impl Send for AutoCloseTimer {}

    unsafe extern "C" fn expiry_cb<C: Clock>(arg: *mut core::ffi::c_void) {
        // SAFETY: `arg` is the leaked `Expiry<C>` registered in `new`; it
        // lives for the rest of the program.
        let expiry = unsafe { &*(arg as *const Expiry<C>) };
        expiry.fire();
    }

    impl AutoCloseTimer {
        pub fn new<C: Clock + Send + Sync + 'static>(valve: SharedValve, clock: C) -> Result<Self, ActuatorError> {
            let expiry: &'static Expiry<C> = Box::leak(Box::new(Expiry { valve, clock }));
            let args = esp_timer_create_args_t {
                callback: Some(expiry_cb::<C>),
                arg: expiry as *const Expiry<C> as *mut core::ffi::c_void,
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"valve_close".as_ptr(),
                skip_unhandled_events: false,
            };
            let mut handle: esp_timer_handle_t = core::ptr::null_mut();
            // SAFETY: `args` outlives the call; `handle` receives the timer.
            let ret = unsafe { esp_timer_create(&args, &mut handle) };
            if ret != ESP_OK as esp_err_t {
                log::error!("hw_timer: valve timer create failed (rc={})", ret);
                return Err(ActuatorError::TimerFailed);
            }
            info!("hw_timer: valve auto-close timer ready");
            Ok(Self { handle })
        }
    }

    impl ValveTimer for AutoCloseTimer {
        fn arm(&mut self, after_ms: u32) -> Result<(), ActuatorError> {
            // SAFETY: handle was created in `new` and is never deleted.
            // Stopping an idle timer returns ESP_ERR_INVALID_STATE, which is fine.
            unsafe {
                esp_timer_stop(self.handle);
                let ret = esp_timer_start_once(self.handle, u64::from(after_ms) * 1_000);
                if ret != ESP_OK as esp_err_t {
                    log::error!("hw_timer: valve timer start failed (rc={})", ret);
                    return Err(ActuatorError::TimerFailed);
                }
            }
            Ok(())
        }

        fn disarm(&mut self) -> Result<(), ActuatorError> {
            // SAFETY: as in `arm`.
            let ret = unsafe { esp_timer_stop(self.handle) };
            if ret != ESP_OK as esp_err_t && ret != ESP_ERR_INVALID_STATE as esp_err_t {
                return Err(ActuatorError::TimerFailed);
            }
            Ok(())
        }
    }
}

// ── Host: sleeping thread ─────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod imp {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    pub struct AutoCloseTimer {
        expiry: Arc<dyn Fn() + Send + Sync>,
        generation: Arc<AtomicU64>,
    }

    impl AutoCloseTimer {
        pub fn new<C: Clock + Send + Sync + 'static>(valve: SharedValve, clock: C) -> Result<Self, ActuatorError> {
            let expiry = Expiry { valve, clock };
            info!("hw_timer(sim): valve auto-close timer ready");
            Ok(Self {
                expiry: Arc::new(move || expiry.fire()),
                generation: Arc::new(AtomicU64::new(0)),
            })
        }
    }

    impl ValveTimer for AutoCloseTimer {
        fn arm(&mut self, after_ms: u32) -> Result<(), ActuatorError> {
            let armed = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            let generation = Arc::clone(&self.generation);
            let expiry = Arc::clone(&self.expiry);
            std::thread::Builder::new()
                .name("valve_close".into())
                .spawn(move || {
                    std::thread::sleep(Duration::from_millis(u64::from(after_ms)));
                    if generation.load(Ordering::Acquire) == armed {
                        expiry();
                    }
                })
                .map(|_| ())
                .map_err(|_| ActuatorError::TimerFailed)
        }

        fn disarm(&mut self) -> Result<(), ActuatorError> {
            self.generation.fetch_add(1, Ordering::AcqRel);
            Ok(())
        }
    }
}

pub use imp::AutoCloseTimer;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::time::MonotonicClock;
    use crate::app::ports::ValveOutput;
    use std::time::Duration;

    struct Pin;

    impl ValveOutput for Pin {
        fn set_open(&mut self, _open: bool) -> Result<(), ActuatorError> {
            Ok(())
        }
    }

    #[test]
    fn expiry_closes_valve() {
        let clock = MonotonicClock::new();
        let valve = SharedValve::new(Pin);
        let mut timer = AutoCloseTimer::new(valve.clone(), clock.clone()).unwrap();

        valve.lock().open(clock.now_ms()).unwrap();
        timer.arm(30).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert!(!valve.is_open());
        assert!(valve.lock().last_closed_at_ms().is_some());
    }

    #[test]
    fn disarm_cancels_pending_expiry() {
        let clock = MonotonicClock::new();
        let valve = SharedValve::new(Pin);
        let mut timer = AutoCloseTimer::new(valve.clone(), clock.clone()).unwrap();

        valve.lock().open(clock.now_ms()).unwrap();
        timer.arm(30).unwrap();
        timer.disarm().unwrap();
        std::thread::sleep(Duration::from_millis(120));
        assert!(valve.is_open());
    }

    #[test]
    fn rearm_supersedes_previous_deadline() {
        let clock = MonotonicClock::new();
        let valve = SharedValve::new(Pin);
        let mut timer = AutoCloseTimer::new(valve.clone(), clock.clone()).unwrap();

        valve.lock().open(clock.now_ms()).unwrap();
        timer.arm(30).unwrap();
        timer.arm(400).unwrap();
        std::thread::sleep(Duration::from_millis(150));
        assert!(valve.is_open());
        std::thread::sleep(Duration::from_millis(500));
        assert!(!valve.is_open());
    }
}
