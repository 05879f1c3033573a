//! One-shot GPIO setup and the rotary encoder ISRs.
//!
//! Runs once from `main()` before the event loop: the valve output is
//! configured low (closed), the encoder inputs get their pull-ups and edge
//! triggers, then the per-pin ISR service is installed. UART and I²C are
//! owned by their esp-idf-hal drivers and are not touched here.
//!
//! | GPIO        | Mode   | Pull | Interrupt    |
//! |-------------|--------|------|--------------|
//! | valve       | output | none | -            |
//! | rotary A    | input  | up   | rising edge  |
//! | rotary B    | input  | up   | - (sampled)  |
//! | rotary SW   | input  | up   | falling edge |

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::drivers::rotary::RotaryInput;
#[cfg(target_os = "espidf")]
use crate::pins;

/// Failed ESP-IDF call during setup; `rc` is the `esp_err_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    PinConfig { pin: i32, rc: i32 },
    IsrService(i32),
    IsrHandler { pin: i32, rc: i32 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PinConfig { pin, rc } => write!(f, "gpio_config on GPIO {} returned {}", pin, rc),
            Self::IsrService(rc) => write!(f, "gpio_install_isr_service returned {}", rc),
            Self::IsrHandler { pin, rc } => write!(f, "ISR handler for GPIO {} returned {}", pin, rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
fn esp_check(rc: esp_err_t, err: impl FnOnce(i32) -> HwInitError) -> Result<(), HwInitError> {
    if rc == ESP_OK as esp_err_t { Ok(()) } else { Err(err(rc)) }
}

// ── Pin setup ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn configure_pin(pin: i32, mode: gpio_mode_t, pull_up: bool, intr_type: gpio_int_type_t) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up { gpio_pullup_t_GPIO_PULLUP_ENABLE } else { gpio_pullup_t_GPIO_PULLUP_DISABLE },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type,
    };
    // SAFETY: `cfg` is a fully initialised config for one valid pin.
    esp_check(unsafe { gpio_config(&cfg) }, |rc| HwInitError::PinConfig { pin, rc })
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    configure_pin(pins::VALVE_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT, false, gpio_int_type_t_GPIO_INTR_DISABLE)?;
    gpio_write(pins::VALVE_GPIO, false).map_err(|rc| HwInitError::PinConfig { pin: pins::VALVE_GPIO, rc })?;

    configure_pin(pins::ROTARY_A_GPIO, gpio_mode_t_GPIO_MODE_INPUT, true, gpio_int_type_t_GPIO_INTR_POSEDGE)?;
    configure_pin(pins::ROTARY_B_GPIO, gpio_mode_t_GPIO_MODE_INPUT, true, gpio_int_type_t_GPIO_INTR_DISABLE)?;
    configure_pin(pins::ROTARY_SW_GPIO, gpio_mode_t_GPIO_MODE_INPUT, true, gpio_int_type_t_GPIO_INTR_NEGEDGE)?;

    info!(
        "hw_init: valve GPIO {} (closed), rotary A={} B={} SW={}",
        pins::VALVE_GPIO,
        pins::ROTARY_A_GPIO,
        pins::ROTARY_B_GPIO,
        pins::ROTARY_SW_GPIO
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): GPIO setup skipped");
    Ok(())
}

/// Drive an output pin. `Err` carries the ESP-IDF return code.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    // SAFETY: gpio_set_level only writes the output register of a configured pin.
    let rc = unsafe { gpio_set_level(pin, u32::from(high)) };
    if rc == ESP_OK as esp_err_t { Ok(()) } else { Err(rc) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), i32> {
    Ok(())
}

// ── Rotary ISRs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn isr_now_ms() -> u32 {
    // SAFETY: esp_timer_get_time reads a hardware counter; ISR-safe.
    (unsafe { esp_timer_get_time() } / 1_000) as u32
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn encoder_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static RotaryInput` registered in init_isr_service.
    let rotary = unsafe { &*(arg as *const RotaryInput) };
    // SAFETY: gpio_get_level is a register read; ISR-safe.
    let b_low = unsafe { gpio_get_level(pins::ROTARY_B_GPIO) } == 0;
    rotary.on_encoder_edge(b_low, isr_now_ms());
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn switch_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: see encoder_isr.
    let rotary = unsafe { &*(arg as *const RotaryInput) };
    rotary.on_switch_edge(isr_now_ms());
}

/// Install the GPIO ISR service and hook the encoder and switch edges to
/// `rotary`. Call after [`init_peripherals`].
#[cfg(target_os = "espidf")]
pub fn init_isr_service(rotary: &'static RotaryInput) -> Result<(), HwInitError> {
    let arg = rotary as *const RotaryInput as *mut core::ffi::c_void;

    // SAFETY: ESP_ERR_INVALID_STATE means another driver installed the
    // service already, which is fine.
    let rc = unsafe { gpio_install_isr_service(0) };
    if rc != ESP_ERR_INVALID_STATE as esp_err_t {
        esp_check(rc, HwInitError::IsrService)?;
    }

    let handlers: [(i32, unsafe extern "C" fn(*mut core::ffi::c_void)); 2] =
        [(pins::ROTARY_A_GPIO, encoder_isr), (pins::ROTARY_SW_GPIO, switch_isr)];
    for (pin, handler) in handlers {
        // SAFETY: the handlers only read `rotary`, which is 'static, through
        // atomics and try_send.
        esp_check(unsafe { gpio_isr_handler_add(pin, Some(handler), arg) }, |rc| {
            HwInitError::IsrHandler { pin, rc }
        })?;
        // SAFETY: the pin was configured with an edge trigger above.
        unsafe { gpio_intr_enable(pin) };
    }

    info!("hw_init: rotary ISRs installed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(_rotary: &'static RotaryInput) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
