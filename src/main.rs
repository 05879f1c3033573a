//! Greenhouse CO2 controller: main entry point.
//!
//! Hexagonal architecture with a single-threaded control loop, an uplink
//! worker thread and an ESP timer for the valve auto-close.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    EepromStore     LogEventSink   LogDisplay  │
//! │  (Sensor+Actuator)  (SetpointStore) (EventSink)    (Display)   │
//! │  ValveDriver        AutoCloseTimer  WifiAdapter    EspHttps    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Controller · SafetyVent · SharedValve                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickScheduler → EventQueue · UiState · uplink worker          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embassy_sync::channel::Channel;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{config::Config as UartConfig, config::StopBits, UartDriver};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use greenhouse::adapters::display::LogDisplay;
use greenhouse::adapters::eeprom::EepromStore;
use greenhouse::adapters::hardware::HardwareAdapter;
use greenhouse::adapters::http::EspHttpsTransport;
use greenhouse::adapters::log_sink::LogEventSink;
use greenhouse::adapters::time::MonotonicClock;
use greenhouse::adapters::wifi::{ConnectivityPort, WifiAdapter};
use greenhouse::app::channels::{self, CommandChannel, RotaryQueue, TelemetryChannel};
use greenhouse::app::commands::{AppCommand, CommandSource};
use greenhouse::app::ports::{Clock, DisplayPort};
use greenhouse::app::service::AppService;
use greenhouse::bus::modbus::ModbusRtu;
use greenhouse::config::SystemConfig;
use greenhouse::control::valve::SharedValve;
use greenhouse::drivers::fan::FanDriver;
use greenhouse::drivers::hw_init;
use greenhouse::drivers::hw_timer::AutoCloseTimer;
use greenhouse::drivers::rotary::{RotaryInput, RotaryKind};
use greenhouse::drivers::valve::ValveDriver;
use greenhouse::events::{Event, EventQueue};
use greenhouse::pins;
use greenhouse::scheduler::TickScheduler;
use greenhouse::sensors::SensorHub;
use greenhouse::telemetry::uplink::{self, Uplink};
use greenhouse::ui::UiState;

/// Longest the loop sleeps, so rotary input is drained promptly.
const MAX_IDLE_MS: u64 = 20;

const UPLINK_STACK_BYTES: usize = 16 * 1024;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Greenhouse v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::load();
    let clock = MonotonicClock::new();
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. GPIO, ISRs and channels ────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without the valve output configured the controller must not run.
        error!("HAL init failed: {}, halting", e);
        loop {
            FreeRtos::delay_ms(1_000);
        }
    }

    let rotary_queue: &'static RotaryQueue = channels::leak(Channel::new());
    let samples: &'static TelemetryChannel = channels::leak(Channel::new());
    let commands: &'static CommandChannel = channels::leak(Channel::new());
    let rotary = channels::leak(RotaryInput::new(rotary_queue, config.rotary_debounce_ms));
    if let Err(e) = hw_init::init_isr_service(rotary) {
        error!("ISR service init failed: {}, continuing without rotary input", e);
    }

    let mut display = LogDisplay::new();
    display.show(&UiState::splash());

    // ── 3. Buses ──────────────────────────────────────────────
    let uart_config = UartConfig::new()
        .baudrate(Hertz(pins::MODBUS_BAUD))
        .stop_bits(StopBits::STOP2);
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio4,
        peripherals.pins.gpio5,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart_config,
    )?;
    let modbus = ModbusRtu::new(uart, pins::MODBUS_TIMEOUT_MS);

    let eeprom_i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio16,
        peripherals.pins.gpio17,
        &I2cConfig::new().baudrate(Hertz(pins::I2C0_BAUD_HZ)),
    );
    let mut store = match eeprom_i2c {
        Ok(i2c) => Some(EepromStore::new(
            i2c,
            FreeRtos,
            pins::EEPROM_ADDR,
            pins::EEPROM_SETPOINT_OFFSET,
            config.max_setpoint_ppm as u16,
        )),
        Err(e) => {
            warn!("EEPROM bus init failed ({}), running without a store", e);
            None
        }
    };

    let pressure_i2c = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio14,
        peripherals.pins.gpio15,
        &I2cConfig::new().baudrate(Hertz(pins::I2C1_BAUD_HZ)),
    )
    .inspect_err(|e| warn!("pressure bus init failed ({})", e))
    .ok();

    // ── 4. Hardware adapter, valve and timer ──────────────────
    let sensors = SensorHub::new(&config, pressure_i2c);
    let mut hw = HardwareAdapter::new(modbus, FreeRtos, sensors, FanDriver::new());
    hw.start_fan(config.fan_startup_percent);

    let valve = SharedValve::new(ValveDriver::new(pins::VALVE_GPIO));
    let timer = AutoCloseTimer::new(valve.clone(), clock.clone())
        .map_err(|e| anyhow::anyhow!("valve timer: {}", e))?;

    // ── 5. App service and UI ─────────────────────────────────
    let mut log_sink = LogEventSink::new();
    let mut app = AppService::new(&config, valve, Box::new(timer));
    let setpoint = app.start(&mut store, &mut log_sink);
    let mut ui = UiState::new(&config);
    ui.set_local_setpoint(setpoint);

    // ── 6. WiFi and uplink worker ─────────────────────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sys_loop)?, clock.clone());
    match wifi.set_credentials(&config.wifi.ssid, &config.wifi.password) {
        Ok(()) => {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: initial connect failed ({}), uplink will retry", e);
            }
        }
        Err(e) => warn!("WiFi: {}, telemetry disabled", e),
    }
    let transport = EspHttpsTransport::new(config.telemetry.timeout_ms);
    let worker = Uplink::new(transport, wifi, config.telemetry.clone());
    std::thread::Builder::new()
        .name("uplink".into())
        .stack_size(UPLINK_STACK_BYTES)
        .spawn(move || uplink::run(worker, samples, commands))?;

    // ── 7. Event loop ─────────────────────────────────────────
    let mut sched = TickScheduler::from_config(&config, clock.now_ms());
    let mut queue = EventQueue::new();
    info!("System ready. Entering event loop.");

    loop {
        while let Ok(input) = rotary_queue.try_receive() {
            match input.kind {
                RotaryKind::Turn { clockwise } => ui.on_turn(if clockwise { 1 } else { -1 }),
                RotaryKind::Press => {
                    if let Some(value) = ui.on_press(input.at_ms) {
                        let cmd = AppCommand::SetSetpoint { value, source: CommandSource::Local };
                        app.handle_command(cmd, &mut store, &mut log_sink);
                    }
                }
            }
        }

        while let Ok(cmd) = commands.try_receive() {
            app.handle_command(cmd, &mut store, &mut log_sink);
        }

        sched.poll(clock.now_ms(), &mut queue);
        queue.drain(|event| match event {
            Event::ControlTick => app.tick(&mut hw, clock.now_ms(), &mut log_sink),
            Event::UiRefresh => display.show(&ui.refresh(&app.state())),
            Event::TelemetryTick => {
                if samples.try_send(app.build_telemetry()).is_err() {
                    warn!("UPLINK | worker busy, sample dropped");
                }
            }
            Event::StoreMaintenance => app.maintain_store(&mut store, &mut log_sink),
        });

        let idle = sched.time_to_next(clock.now_ms()).unwrap_or(MAX_IDLE_MS).min(MAX_IDLE_MS);
        FreeRtos::delay_ms(idle as u32);
    }
}
