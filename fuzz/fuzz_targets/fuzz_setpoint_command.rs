//! Fuzz target: `telemetry::command::find_setpoint`
//!
//! The response body comes from the network, so the scanner sees arbitrary
//! text, including truncated UTF-8 that the uplink trims before scanning.
//!
//! Invariants checked:
//! - No panics under any input
//! - A body without the `SETPOINT=` token never yields a command
//!
//! cargo fuzz run fuzz_setpoint_command

#![no_main]

use greenhouse::telemetry::command::find_setpoint;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = match core::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&data[..e.valid_up_to()]).unwrap_or_default(),
    };

    let found = find_setpoint(text);
    if !text.contains("SETPOINT=") {
        assert!(found.is_none());
    }
});
