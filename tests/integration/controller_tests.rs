//! Controller behaviour through the AppService: valve, vent and sensors.

use greenhouse::app::events::{AppEvent, CloseReason};
use greenhouse::config::SystemConfig;
use greenhouse::error::ActuatorError;
use greenhouse::sensors::SensorKind;

use crate::mock_hw::{MemStore, Rig};

#[test]
fn open_arms_timer_for_max_open_time() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.cycle(1000.0, 0);

    assert!(rig.valve.is_open());
    assert_eq!(rig.timer.armed_for(), Some(2_000));
    assert_eq!(rig.output.writes(), vec![true]);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ValveOpened)), 1);
}

#[test]
fn held_open_valve_is_not_rearmed() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.cycle(1000.0, 0);
    rig.cycle(1050.0, 500);
    rig.cycle(1100.0, 1_000);

    assert_eq!(rig.timer.arm_count(), 1);
    assert_eq!(rig.output.writes(), vec![true]);
}

#[test]
fn reaching_setpoint_closes_and_disarms() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.cycle(1000.0, 0);
    rig.cycle(1500.0, 500);

    assert!(!rig.valve.is_open());
    assert_eq!(rig.timer.armed_for(), None);
    assert_eq!(rig.app.state().valve_last_closed_at_ms, Some(500));
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ValveClosed { reason: CloseReason::SetpointReached })),
        1
    );
}

#[test]
fn failed_co2_read_keeps_last_value_and_reports_fault() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.cycle(1600.0, 0);

    rig.hw.co2 = None;
    rig.app.tick(&mut rig.hw, 500, &mut rig.sink);

    assert_eq!(rig.app.state().current_co2, 1600.0);
    assert!(!rig.valve.is_open(), "stale reading above setpoint must not open the valve");
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SensorFault(f) if f.kind == SensorKind::Co2)),
        1
    );
}

#[test]
fn failed_trh_read_leaves_temperature_and_humidity() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.hw.temperature = Some(24.5);
    rig.hw.humidity = Some(70.0);
    rig.cycle(1600.0, 0);

    rig.hw.temperature = None;
    rig.hw.humidity = None;
    rig.cycle(1600.0, 500);

    let s = rig.app.state();
    assert_eq!(s.current_temperature, 24.5);
    assert_eq!(s.current_humidity, 70.0);
}

#[test]
fn broken_valve_output_reports_fault_and_stays_closed() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.output.break_output();
    rig.cycle(1000.0, 0);

    assert!(!rig.valve.is_open());
    assert_eq!(rig.timer.armed_for(), None);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ValveFault(ActuatorError::GpioWriteFailed))),
        1
    );
}

#[test]
fn lower_threshold_from_config_trips_earlier() {
    let config = SystemConfig {
        safety_threshold_ppm: 1800.0,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(&config, MemStore::holding(1500));
    rig.start();
    rig.cycle(1850.0, 0);

    assert!(rig.app.state().safety_override_active);
    assert_eq!(rig.hw.fan_commands.last().copied(), Some(100.0));
}

#[test]
fn every_cycle_emits_a_snapshot() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    for i in 0..4 {
        rig.cycle(1600.0, i * 500);
    }
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Cycle(_))), 4);
    assert_eq!(rig.app.cycles(), 4);
}

#[test]
fn co2_sensor_dead_at_boot_keeps_valve_closed() {
    let mut rig = Rig::new(MemStore::holding(1500));
    rig.start();
    rig.hw.co2 = None;
    for i in 0..200 {
        rig.app.tick(&mut rig.hw, i * 500, &mut rig.sink);
    }

    assert!(!rig.valve.is_open());
    assert!(rig.output.writes().is_empty());
    assert_eq!(rig.timer.arm_count(), 0);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ValveOpened)), 0);
}
