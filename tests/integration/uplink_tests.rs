//! Telemetry round trip: sample → form POST → response → remote command.

use embassy_sync::channel::Channel;
use greenhouse::adapters::time::MonotonicClock;
use greenhouse::adapters::wifi::{ConnectivityPort, WifiAdapter};
use greenhouse::app::channels::{self, CommandChannel};
use greenhouse::app::commands::CommandSource;
use greenhouse::app::events::AppEvent;
use greenhouse::config::TelemetryConfig;
use greenhouse::error::{CommsError, RangeViolation};
use greenhouse::telemetry::uplink::{forward, HttpTransport, Uplink};

use crate::mock_hw::{MemStore, Rig};

/// Captures the last body and answers with a canned response.
struct Server {
    reply: String,
    status: Option<u16>,
    last_body: String,
}

impl Server {
    fn answering(reply: &str) -> Self {
        Self { reply: reply.to_string(), status: None, last_body: String::new() }
    }
}

impl HttpTransport for Server {
    fn post_form(&mut self, _url: &str, body: &str, response: &mut [u8]) -> Result<usize, CommsError> {
        self.last_body = body.to_string();
        if let Some(code) = self.status {
            return Err(CommsError::HttpStatus(code));
        }
        let n = self.reply.len().min(response.len());
        response[..n].copy_from_slice(&self.reply.as_bytes()[..n]);
        Ok(n)
    }
}

fn online_wifi() -> WifiAdapter {
    let mut wifi = WifiAdapter::new(MonotonicClock::new());
    wifi.set_credentials("Greenhouse", "password1").unwrap();
    wifi.connect().unwrap();
    wifi
}

#[test]
fn sample_fields_reach_the_form_body() {
    let mut rig = Rig::new(MemStore::holding(1200));
    rig.start();
    rig.hw.temperature = Some(22.25);
    rig.hw.humidity = Some(55.5);
    rig.cycle(812.0, 0);

    let mut up = Uplink::new(Server::answering("{}"), online_wifi(), TelemetryConfig::default());
    let commands: &CommandChannel = channels::leak(Channel::new());
    forward(&mut up, &rig.app.build_telemetry(), commands);

    let body = &up.transport().last_body;
    assert!(body.contains("field1=812.00"));
    assert!(body.contains("field2=55.50"));
    assert!(body.contains("field3=22.25"));
    assert!(body.contains("field5=1200.00"));
}

#[test]
fn remote_setpoint_round_trip_applies_in_range_value() {
    let mut rig = Rig::new(MemStore::holding(1200));
    rig.start();

    let reply = r#"{"channel_id":2,"field1":"812.00","command_string":"SETPOINT=900"}"#;
    let mut up = Uplink::new(Server::answering(reply), online_wifi(), TelemetryConfig::default());
    let commands: &CommandChannel = channels::leak(Channel::new());
    assert!(forward(&mut up, &rig.app.build_telemetry(), commands));

    while let Ok(cmd) = commands.try_receive() {
        rig.app.handle_command(cmd, &mut rig.store, &mut rig.sink);
    }
    assert_eq!(rig.app.state().co2_setpoint, 900.0);
    assert_eq!(rig.store.slot, Some(900));
}

#[test]
fn remote_setpoint_above_max_is_dropped() {
    let mut rig = Rig::new(MemStore::holding(1200));
    rig.start();

    let mut up = Uplink::new(
        Server::answering(r#"{"command_string":"SETPOINT=1600"}"#),
        online_wifi(),
        TelemetryConfig::default(),
    );
    let commands: &CommandChannel = channels::leak(Channel::new());
    forward(&mut up, &rig.app.build_telemetry(), commands);
    while let Ok(cmd) = commands.try_receive() {
        rig.app.handle_command(cmd, &mut rig.store, &mut rig.sink);
    }

    assert_eq!(rig.app.state().co2_setpoint, 1200.0);
    assert!(rig.store.writes.is_empty());
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::SetpointRejected {
                source: CommandSource::Remote,
                reason: RangeViolation::AboveMaximum,
                ..
            }
        )),
        1
    );
}

#[test]
fn http_error_queues_nothing() {
    let mut server = Server::answering("");
    server.status = Some(500);
    let mut up = Uplink::new(server, online_wifi(), TelemetryConfig::default());
    let commands: &CommandChannel = channels::leak(Channel::new());

    assert!(!forward(&mut up, &Default::default(), commands));
    assert!(commands.try_receive().is_err());
    assert_eq!(up.failed(), 1);
}

#[test]
fn offline_wifi_skips_upload() {
    let mut wifi = online_wifi();
    wifi.set_reachable(false);
    let mut up = Uplink::new(Server::answering("{}"), wifi, TelemetryConfig::default());

    assert_eq!(up.publish(&Default::default()), Err(CommsError::WifiDisconnected));
    assert!(up.transport().last_body.is_empty());
}
