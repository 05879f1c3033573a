//! System configuration parameters
//!
//! All tunable parameters for the greenhouse controller. Defaults are
//! compiled in; site secrets (WiFi, telemetry keys) come from build-time
//! environment variables, and a complete JSON document in
//! `GREENHOUSE_CONFIG_JSON` may replace the defaults wholesale.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Telemetry uplink parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Full URL of the update endpoint (HTTPS).
    pub endpoint: heapless::String<96>,
    /// Channel write key.
    pub api_key: heapless::String<32>,
    /// TalkBack key, lets the server piggy-back queued commands on the reply.
    pub talkback_key: heapless::String<32>,
    pub latitude: f32,
    pub longitude: f32,
    /// Free-text status attached to every update.
    pub status: heapless::String<48>,
    /// Request timeout (milliseconds)
    pub timeout_ms: u32,
}

/// WiFi station credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Setpoint ---
    /// Setpoint used when no store is present at boot (ppm)
    pub default_setpoint_ppm: f32,
    /// Value the store reports when its slot is unreadable (ppm)
    pub store_fallback_ppm: u16,
    /// Upper bound for any accepted setpoint (ppm)
    pub max_setpoint_ppm: f32,

    // --- Safety / valve ---
    /// CO2 concentration above which the safety vent engages (ppm)
    pub safety_threshold_ppm: f32,
    /// Minimum time between a valve close and the next open (ms)
    pub valve_cooldown_ms: u32,
    /// Hard upper bound on a single valve-open period (ms)
    pub valve_max_open_ms: u32,
    /// Fan command written once at boot before the loop takes over (%)
    pub fan_startup_percent: f32,

    // --- Sensors ---
    pub co2_max_attempts: u8,
    pub co2_retry_backoff_ms: u32,
    /// Settling window after an accepted CO2 reading (ms)
    pub co2_settle_ms: u32,
    pub trh_max_attempts: u8,
    pub trh_retry_backoff_ms: u32,
    /// Whether the differential pressure sensor is fitted
    pub pressure_enabled: bool,
    /// Read and verify the pressure sensor's CRC byte
    pub pressure_crc: bool,
    /// Site altitude for pressure compensation (m); 0 disables compensation
    pub altitude_m: f32,

    // --- UI ---
    /// Setpoint change per encoder detent (ppm)
    pub ui_step_ppm: f32,
    /// Button presses closer together than this are ignored (ms)
    pub ui_press_debounce_ms: u32,
    /// ISR-level debounce on encoder and switch edges (ms)
    pub rotary_debounce_ms: u32,
    /// Number of refreshes the "Saved!" banner stays visible
    pub ui_saved_banner_refreshes: u8,

    // --- Timing ---
    /// Sensor read + control update interval (milliseconds)
    pub control_interval_ms: u32,
    /// Display refresh interval (milliseconds)
    pub ui_refresh_ms: u32,
    /// Telemetry upload interval (milliseconds)
    pub telemetry_interval_ms: u32,
    /// First setpoint-store check after boot (milliseconds)
    pub store_first_check_ms: u32,
    /// Setpoint-store check interval after the first (milliseconds)
    pub store_check_interval_ms: u32,

    pub telemetry: TelemetryConfig,
    pub wifi: WifiConfig,
}

/// Copy as much of `value` as fits; build-time secrets are never fatal.
fn env_string<const N: usize>(value: Option<&str>) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in value.unwrap_or("").chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: env_string(Some("https://api.thingspeak.com/update.json")),
            api_key: env_string(option_env!("GREENHOUSE_API_KEY")),
            talkback_key: env_string(option_env!("GREENHOUSE_TALKBACK_KEY")),
            latitude: 60.1699,
            longitude: 24.9384,
            status: env_string(Some("Update from Helsinki")),
            timeout_ms: 15_000,
        }
    }
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: env_string(option_env!("GREENHOUSE_WIFI_SSID")),
            password: env_string(option_env!("GREENHOUSE_WIFI_PASSWORD")),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Setpoint
            default_setpoint_ppm: 1500.0,
            store_fallback_ppm: 1000,
            max_setpoint_ppm: 1500.0,

            // Safety / valve
            safety_threshold_ppm: 2000.0,
            valve_cooldown_ms: 30_000,
            valve_max_open_ms: 2_000,
            fan_startup_percent: 75.0,

            // Sensors
            co2_max_attempts: 10,
            co2_retry_backoff_ms: 10,
            co2_settle_ms: 3_000,
            trh_max_attempts: 5,
            trh_retry_backoff_ms: 200,
            pressure_enabled: true,
            pressure_crc: false,
            altitude_m: 0.0,

            // UI
            ui_step_ppm: 10.0,
            ui_press_debounce_ms: 150,
            rotary_debounce_ms: 200,
            ui_saved_banner_refreshes: 20,

            // Timing
            control_interval_ms: 500,
            ui_refresh_ms: 1_000,
            telemetry_interval_ms: 60_000,
            store_first_check_ms: 5_000,
            store_check_interval_ms: 50_000,

            telemetry: TelemetryConfig::default(),
            wifi: WifiConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Parse a full configuration document and validate it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("malformed JSON document"))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, replaced by the build-time JSON override when one was baked in.
    pub fn load() -> Self {
        match option_env!("GREENHOUSE_CONFIG_JSON") {
            Some(text) => match Self::from_json(text) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Config override rejected ({}), using defaults", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    /// Range-check every field that the control loop relies on.
    ///
    /// Invalid values are rejected, never clamped: a bad override must not
    /// quietly weaken the safety vent or the valve guards.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_setpoint_ppm > 0.0 && self.max_setpoint_ppm < self.safety_threshold_ppm) {
            return Err(Error::Config(
                "max_setpoint_ppm must be positive and below safety_threshold_ppm",
            ));
        }
        if !(0.0..=self.max_setpoint_ppm).contains(&self.default_setpoint_ppm) {
            return Err(Error::Config("default_setpoint_ppm outside [0, max_setpoint_ppm]"));
        }
        if f32::from(self.store_fallback_ppm) > self.max_setpoint_ppm {
            return Err(Error::Config("store_fallback_ppm above max_setpoint_ppm"));
        }
        if self.valve_max_open_ms == 0 || self.valve_max_open_ms > 60_000 {
            return Err(Error::Config("valve_max_open_ms must be 1-60000"));
        }
        if self.valve_cooldown_ms < self.valve_max_open_ms {
            return Err(Error::Config("valve_cooldown_ms shorter than valve_max_open_ms"));
        }
        if !(0.0..=100.0).contains(&self.fan_startup_percent) {
            return Err(Error::Config("fan_startup_percent must be 0-100"));
        }
        if self.co2_max_attempts == 0 || self.trh_max_attempts == 0 {
            return Err(Error::Config("sensor attempt counts must be at least 1"));
        }
        if !(self.ui_step_ppm > 0.0) {
            return Err(Error::Config("ui_step_ppm must be positive"));
        }
        if self.control_interval_ms == 0
            || self.ui_refresh_ms == 0
            || self.telemetry_interval_ms == 0
            || self.store_check_interval_ms == 0
        {
            return Err(Error::Config("task intervals must be non-zero"));
        }
        if self.telemetry.timeout_ms == 0 {
            return Err(Error::Config("telemetry.timeout_ms must be non-zero"));
        }
        Ok(())
    }
}
