//! Rotary UI wired to the AppService the way the main loop does it.

use greenhouse::app::commands::{AppCommand, CommandSource};
use greenhouse::app::events::AppEvent;
use greenhouse::config::SystemConfig;
use greenhouse::ui::UiState;

use crate::mock_hw::{MemStore, Rig};

fn commit(rig: &mut Rig, ui: &mut UiState, at_ms: u32) {
    if let Some(value) = ui.on_press(at_ms) {
        let cmd = AppCommand::SetSetpoint { value, source: CommandSource::Local };
        rig.app.handle_command(cmd, &mut rig.store, &mut rig.sink);
    }
}

#[test]
fn edit_and_commit_reaches_controller_and_store() {
    let mut rig = Rig::new(MemStore::holding(1000));
    let mut ui = UiState::new(&SystemConfig::default());
    ui.set_local_setpoint(rig.start());

    ui.on_press(1_000);
    for _ in 0..5 {
        ui.on_turn(1);
    }
    commit(&mut rig, &mut ui, 2_000);

    assert_eq!(rig.app.state().co2_setpoint, 1050.0);
    assert_eq!(rig.store.slot, Some(1050));
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SetpointChanged { source: CommandSource::Local, .. })),
        1
    );
    assert!(ui.refresh(&rig.app.state()).contains("Saved!"));
}

#[test]
fn remote_change_shows_when_not_editing() {
    let mut rig = Rig::new(MemStore::holding(1000));
    let mut ui = UiState::new(&SystemConfig::default());
    ui.set_local_setpoint(rig.start());

    let cmd = AppCommand::SetSetpoint { value: 1200.0, source: CommandSource::Remote };
    rig.app.handle_command(cmd, &mut rig.store, &mut rig.sink);

    let screen = ui.refresh(&rig.app.state());
    assert!(screen.contains("Set: 1200.0 ppm"));
    assert_eq!(ui.local_setpoint(), 1200.0);
}

#[test]
fn remote_change_does_not_disturb_an_edit_in_progress() {
    let mut rig = Rig::new(MemStore::holding(1000));
    let mut ui = UiState::new(&SystemConfig::default());
    ui.set_local_setpoint(rig.start());

    ui.on_press(1_000);
    ui.on_turn(-2);
    let cmd = AppCommand::SetSetpoint { value: 1400.0, source: CommandSource::Remote };
    rig.app.handle_command(cmd, &mut rig.store, &mut rig.sink);
    ui.refresh(&rig.app.state());
    assert_eq!(ui.local_setpoint(), 980.0);

    // The local commit wins because it comes last.
    commit(&mut rig, &mut ui, 2_000);
    assert_eq!(rig.app.state().co2_setpoint, 980.0);
}

#[test]
fn bounced_press_does_not_commit() {
    let mut rig = Rig::new(MemStore::holding(1000));
    let mut ui = UiState::new(&SystemConfig::default());
    ui.set_local_setpoint(rig.start());

    ui.on_press(1_000);
    ui.on_turn(3);
    commit(&mut rig, &mut ui, 1_100);

    assert!(ui.is_editing());
    assert_eq!(rig.app.state().co2_setpoint, 1000.0);
    assert!(rig.store.writes.is_empty());
}
