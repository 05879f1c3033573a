//! Telemetry uplink worker.
//!
//! Runs on its own thread so a slow HTTPS round trip never stalls the
//! control loop.
//!
//! ```text
//!  TelemetryChannel ──▶ publish() ──▶ HTTPS POST ──▶ response body
//!                                                        │
//!                          CommandChannel ◀── SETPOINT= ─┘
//! ```
//!
//! A setpoint found in the response is not applied here. It goes back to
//! the control loop as a remote `SetSetpoint` command, where range
//! checking and persistence happen.

use log::{debug, info, warn};

use crate::adapters::wifi::ConnectivityPort;
use crate::app::channels::{CommandChannel, TelemetryChannel};
use crate::app::commands::{AppCommand, CommandSource};
use crate::app::events::TelemetrySample;
use crate::config::TelemetryConfig;
use crate::error::CommsError;

use super::{command, form};

/// Bytes of response body kept for command parsing. Anything past this is
/// discarded by the transport.
pub const RESPONSE_CAP: usize = 1024;

/// One form-encoded HTTPS POST.
pub trait HttpTransport {
    /// POST `body` to `url` and copy as much of the response body as fits
    /// into `response`. Returns the number of bytes copied.
    fn post_form(&mut self, url: &str, body: &str, response: &mut [u8]) -> Result<usize, CommsError>;
}

pub struct Uplink<T: HttpTransport, W: ConnectivityPort> {
    transport: T,
    wifi: W,
    config: TelemetryConfig,
    response: [u8; RESPONSE_CAP],
    sent: u32,
    failed: u32,
}

impl<T: HttpTransport, W: ConnectivityPort> Uplink<T, W> {
    pub fn new(transport: T, wifi: W, config: TelemetryConfig) -> Self {
        Self {
            transport,
            wifi,
            config,
            response: [0; RESPONSE_CAP],
            sent: 0,
            failed: 0,
        }
    }

    /// Send one update. `Ok(Some(v))` carries a setpoint command from the
    /// response; `Ok(None)` means the update went through with no command.
    pub fn publish(&mut self, sample: &TelemetrySample) -> Result<Option<f32>, CommsError> {
        self.wifi.poll();
        if !self.wifi.is_connected() {
            return Err(CommsError::WifiDisconnected);
        }

        let result = self.post(sample);
        match result {
            Ok(_) => self.sent = self.sent.wrapping_add(1),
            Err(_) => self.failed = self.failed.wrapping_add(1),
        }
        result
    }

    fn post(&mut self, sample: &TelemetrySample) -> Result<Option<f32>, CommsError> {
        let body = form::encode_update(sample, &self.config)?;
        let len = self
            .transport
            .post_form(&self.config.endpoint, &body, &mut self.response)?;
        if len == 0 {
            return Err(CommsError::EmptyResponse);
        }

        let raw = &self.response[..len.min(RESPONSE_CAP)];
        // A multi-byte character cut at the buffer end must not hide a
        // command that came before it.
        let text = match core::str::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or_default(),
        };
        debug!("UPLINK | response ({} bytes): {}", len, text);
        Ok(command::find_setpoint(text))
    }

    /// Updates accepted by the server since boot.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Updates that reached the transport and failed.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Publish one sample and queue any returned setpoint for the control
/// loop. Returns `true` if a command was queued.
pub fn forward<T: HttpTransport, W: ConnectivityPort>(
    uplink: &mut Uplink<T, W>,
    sample: &TelemetrySample,
    commands: &CommandChannel,
) -> bool {
    match uplink.publish(sample) {
        Ok(Some(value)) => {
            info!("UPLINK | remote command SETPOINT={:.2}", value);
            let cmd = AppCommand::SetSetpoint { value, source: CommandSource::Remote };
            if commands.try_send(cmd).is_err() {
                warn!("UPLINK | command queue full, SETPOINT={:.2} dropped", value);
                return false;
            }
            true
        }
        Ok(None) => {
            debug!("UPLINK | update sent, no command");
            false
        }
        Err(CommsError::WifiDisconnected) => {
            debug!("UPLINK | WiFi down, sample skipped");
            false
        }
        Err(e) => {
            warn!("UPLINK | update failed: {}", e);
            false
        }
    }
}

/// Worker body: wait for samples forever.
pub fn run<T: HttpTransport, W: ConnectivityPort>(
    mut uplink: Uplink<T, W>,
    samples: &'static TelemetryChannel,
    commands: &'static CommandChannel,
) -> ! {
    info!("UPLINK | worker started");
    loop {
        let sample = futures_lite::future::block_on(samples.receive());
        forward(&mut uplink, &sample, commands);
    }
}
