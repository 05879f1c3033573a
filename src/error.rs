//! Error types, one enum per subsystem plus the umbrella [`Error`].
//!
//! Everything here is `Copy`: faults travel inside sensor snapshots and
//! app events, which are cloned freely and never allocate.
//!
//! None of these are fatal to the control loop: a failed reading keeps the
//! last good value, a failed store write keeps the in-memory setpoint, an
//! out-of-range remote setpoint is dropped.

use core::fmt;

// ---------------------------------------------------------------------------
// Umbrella
// ---------------------------------------------------------------------------

/// Umbrella error; each subsystem error converts into it with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Sensor(SensorError),
    Actuator(ActuatorError),
    Storage(StorageError),
    /// Setpoint command outside the accepted range.
    Range(RangeViolation),
    /// Telemetry uplink failure.
    Comms(CommsError),
    /// Rejected configuration document.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Range(e) => write!(f, "range: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors (Modbus / I2C)
// ---------------------------------------------------------------------------

/// Bus-level failure: the transaction itself went wrong, independent of
/// what the device reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No device handle, or the device did not acknowledge its address.
    NoDevice,
    /// Fewer (or more) bytes moved than the transaction required.
    Length { expected: u8, actual: u8 },
    /// No response within the bus timeout.
    Timeout,
    /// Frame checksum mismatch.
    Crc,
    /// Modbus exception response (function code | 0x80).
    Exception(u8),
    /// Any other bus fault reported by the HAL.
    Bus,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => write!(f, "no device"),
            Self::Length { expected, actual } => {
                write!(f, "length mismatch (expected {expected}, got {actual})")
            }
            Self::Timeout => write!(f, "timeout"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::Exception(code) => write!(f, "exception 0x{code:02X}"),
            Self::Bus => write!(f, "bus fault"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// The device answered but flagged its own data as untrustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Device-level status register was non-nominal.
    DeviceStatus(u16),
    /// Measurement-level status register was non-nominal.
    MeasurementStatus(u16),
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceStatus(s) => write!(f, "device status 0x{s:04X}"),
            Self::MeasurementStatus(s) => write!(f, "measurement status 0x{s:04X}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    Transport(TransportError),
    Validation(ValidationFailure),
    /// A previous acceptance is still inside the hardware settling window.
    Settling,
}

impl SensorError {
    /// `Settling` is pacing, not a failure, and is logged quietly.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Settling)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Settling => write!(f, "settling"),
        }
    }
}

impl From<TransportError> for SensorError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ValidationFailure> for SensorError {
    fn from(e: ValidationFailure) -> Self {
        Self::Validation(e)
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Fan speed register write failed.
    FanWriteFailed(TransportError),
    /// Valve GPIO could not be driven.
    GpioWriteFailed,
    /// The valve auto-close timer could not be armed or cancelled.
    TimerFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FanWriteFailed(e) => write!(f, "fan write failed: {e}"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::TimerFailed => write!(f, "auto-close timer failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors from the persistent setpoint store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No store was constructed (driver missing at boot).
    Unavailable,
    /// The underlying bus transaction failed.
    Transport(TransportError),
    /// The slot has never been written (erased EEPROM reads 0xFFFF).
    Blank,
    /// The slot holds a value no valid setpoint could have produced.
    Corrupted(u16),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "store unavailable"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Blank => write!(f, "slot blank"),
            Self::Corrupted(raw) => write!(f, "slot corrupted (raw={raw})"),
        }
    }
}

impl From<TransportError> for StorageError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Range violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeViolation {
    BelowMinimum,
    AboveMaximum,
    NotANumber,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowMinimum => write!(f, "below minimum"),
            Self::AboveMaximum => write!(f, "above maximum"),
            Self::NotANumber => write!(f, "not a number"),
        }
    }
}

impl From<RangeViolation> for Error {
    fn from(e: RangeViolation) -> Self {
        Self::Range(e)
    }
}

// ---------------------------------------------------------------------------
// Telemetry uplink errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// No WiFi link; the sample is skipped.
    WifiDisconnected,
    /// The request could not be sent (DNS, TLS handshake, socket).
    RequestFailed,
    /// Server answered with a non-2xx status.
    HttpStatus(u16),
    /// No bytes came back.
    EmptyResponse,
    /// The server did not answer within the request timeout.
    Timeout,
    /// The form body did not fit its buffer.
    PayloadTooLarge,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiDisconnected => write!(f, "WiFi disconnected"),
            Self::RequestFailed => write!(f, "request failed"),
            Self::HttpStatus(code) => write!(f, "HTTP status {code}"),
            Self::EmptyResponse => write!(f, "empty response"),
            Self::Timeout => write!(f, "request timed out"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
