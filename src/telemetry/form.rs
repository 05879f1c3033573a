//! URL-encoded form body for a telemetry update.
//!
//! ```text
//! api_key=…&talkback_key=…&field1=<co2>&field2=<rh>&field3=<temp>
//!   &field4=<fan>&field5=<setpoint>&lat=…&long=…&status=…
//! ```
//!
//! Numeric fields carry two decimals. Key and status strings are
//! percent-encoded (RFC 3986 unreserved characters pass through).

use core::fmt::Write;

use crate::app::events::TelemetrySample;
use crate::config::TelemetryConfig;
use crate::error::CommsError;

/// Form body capacity.
pub const FORM_CAP: usize = 512;

pub type FormBody = heapless::String<FORM_CAP>;

/// Build the POST body for one sample.
pub fn encode_update(sample: &TelemetrySample, config: &TelemetryConfig) -> Result<FormBody, CommsError> {
    let mut body = FormBody::new();
    encode_into(&mut body, sample, config).map_err(|_| CommsError::PayloadTooLarge)?;
    Ok(body)
}

fn encode_into(body: &mut FormBody, sample: &TelemetrySample, config: &TelemetryConfig) -> core::fmt::Result {
    body.write_str("api_key=")?;
    percent_encode(body, &config.api_key)?;
    body.write_str("&talkback_key=")?;
    percent_encode(body, &config.talkback_key)?;

    let fields = [
        sample.co2_ppm,
        sample.humidity_pct,
        sample.temperature_c,
        sample.fan_percent,
        sample.setpoint_ppm,
    ];
    for (i, value) in fields.iter().enumerate() {
        write!(body, "&field{}={:.2}", i + 1, value)?;
    }

    write!(body, "&lat={:.4}&long={:.4}&status=", config.latitude, config.longitude)?;
    percent_encode(body, &config.status)
}

fn percent_encode(out: &mut FormBody, s: &str) -> core::fmt::Result {
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b)).map_err(|_| core::fmt::Error)?;
        } else {
            write!(out, "%{:02X}", b)?;
        }
    }
    Ok(())
}
