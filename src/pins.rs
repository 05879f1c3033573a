//! GPIO / peripheral assignments for the greenhouse controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers or bus addresses.

// ---------------------------------------------------------------------------
// Rotary encoder (KY-040 style, A/B quadrature + push switch)
// ---------------------------------------------------------------------------

/// Encoder channel A. A rising edge marks one detent.
pub const ROTARY_A_GPIO: i32 = 10;
/// Encoder channel B. Sampled on the A edge to determine direction.
pub const ROTARY_B_GPIO: i32 = 11;
/// Encoder push switch, active-low with pull-up.
pub const ROTARY_SW_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// CO2 injection valve (solenoid via MOSFET, active HIGH)
// ---------------------------------------------------------------------------

pub const VALVE_GPIO: i32 = 38;

// ---------------------------------------------------------------------------
// I²C0: setpoint EEPROM (24C-series)
// ---------------------------------------------------------------------------

pub const I2C0_SDA_GPIO: i32 = 16;
pub const I2C0_SCL_GPIO: i32 = 17;
pub const I2C0_BAUD_HZ: u32 = 100_000;

/// 7-bit EEPROM address.
pub const EEPROM_ADDR: u8 = 0x50;
/// Byte offset of the two-byte setpoint slot.
pub const EEPROM_SETPOINT_OFFSET: u16 = 0x0000;

// ---------------------------------------------------------------------------
// I²C1: differential pressure sensor + display
// ---------------------------------------------------------------------------

pub const I2C1_SDA_GPIO: i32 = 14;
pub const I2C1_SCL_GPIO: i32 = 15;
pub const I2C1_BAUD_HZ: u32 = 100_000;

/// Sensirion SDP6xx differential pressure sensor.
pub const PRESSURE_ADDR: u8 = 0x40;
/// SSD1306 OLED (not driven directly; frames go to the log display).
pub const DISPLAY_ADDR: u8 = 0x3C;

// ---------------------------------------------------------------------------
// UART1: Modbus RTU (RS-485 transceiver with auto direction)
// ---------------------------------------------------------------------------

pub const MODBUS_TX_GPIO: i32 = 4;
pub const MODBUS_RX_GPIO: i32 = 5;
pub const MODBUS_BAUD: u32 = 9_600;
/// Response timeout for a single Modbus transaction (ms).
pub const MODBUS_TIMEOUT_MS: u32 = 100;

// ---------------------------------------------------------------------------
// Modbus unit addresses and register map
// ---------------------------------------------------------------------------

/// Vaisala GMP252 CO2 probe.
pub const CO2_UNIT: u8 = 240;
pub const CO2_REG_RAW: u16 = 256;
pub const CO2_REG_DEVICE_STATUS: u16 = 2048;
pub const CO2_REG_CO2_STATUS: u16 = 2049;

/// Vaisala HMP60 temperature / relative humidity probe.
pub const TRH_UNIT: u8 = 241;
pub const TRH_REG_HUMIDITY: u16 = 256;
pub const TRH_REG_TEMPERATURE: u16 = 257;
pub const TRH_REG_STATUS: u16 = 512;

/// Produal MIO 12-V fan controller.
pub const FAN_UNIT: u8 = 1;
pub const FAN_REG_SPEED: u16 = 0;
/// Register value for 100 % fan speed.
pub const FAN_FULL_SCALE: u16 = 1000;
