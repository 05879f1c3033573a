//! Setpoint persistence: boot restore, write failures and maintenance.

use greenhouse::app::commands::{AppCommand, CommandSource};
use greenhouse::app::events::{AppEvent, SetpointOrigin};
use greenhouse::error::StorageError;

use crate::mock_hw::{MemStore, Rig};

fn set_local(rig: &mut Rig, value: f32) {
    let cmd = AppCommand::SetSetpoint { value, source: CommandSource::Local };
    rig.app.handle_command(cmd, &mut rig.store, &mut rig.sink);
}

#[test]
fn boot_restores_stored_value() {
    let mut rig = Rig::new(MemStore::holding(1234));
    assert_eq!(rig.start(), 1234.0);
    assert!(matches!(
        rig.sink.events[0],
        AppEvent::Started { origin: SetpointOrigin::Stored, .. }
    ));
}

#[test]
fn blank_store_boots_with_fallback_and_is_not_written() {
    let mut rig = Rig::new(MemStore::default());
    assert_eq!(rig.start(), 1000.0);
    assert!(rig.store.writes.is_empty());
    assert!(matches!(
        rig.sink.events[0],
        AppEvent::Started { origin: SetpointOrigin::Fallback(StorageError::Blank), .. }
    ));
}

#[test]
fn write_failure_keeps_setpoint_and_flags_retry() {
    let mut rig = Rig::new(MemStore::holding(1000));
    rig.start();
    rig.store.fail_writes = true;
    set_local(&mut rig, 1300.0);

    assert_eq!(rig.app.state().co2_setpoint, 1300.0);
    assert!(rig.app.persist_pending());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::StoreWriteFailed(_))), 1);

    rig.store.fail_writes = false;
    rig.app.maintain_store(&mut rig.store, &mut rig.sink);
    assert_eq!(rig.store.slot, Some(1300));
    assert!(!rig.app.persist_pending());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::StoreResynced { value: 1300 })), 1);
}

#[test]
fn maintenance_repairs_blank_slot_after_boot() {
    let mut rig = Rig::new(MemStore::default());
    rig.start();
    rig.app.maintain_store(&mut rig.store, &mut rig.sink);
    assert_eq!(rig.store.slot, Some(1000));
}

#[test]
fn maintenance_leaves_matching_slot_alone() {
    let mut rig = Rig::new(MemStore::holding(1200));
    rig.start();
    rig.app.maintain_store(&mut rig.store, &mut rig.sink);
    assert!(rig.store.writes.is_empty());
}

#[test]
fn maintenance_rewrites_drifted_slot() {
    let mut rig = Rig::new(MemStore::holding(1200));
    rig.start();
    rig.store.slot = Some(900);
    rig.app.maintain_store(&mut rig.store, &mut rig.sink);
    assert_eq!(rig.store.slot, Some(1200));
}

#[test]
fn fractional_setpoint_is_stored_rounded() {
    let mut rig = Rig::new(MemStore::holding(1000));
    rig.start();
    set_local(&mut rig, 1234.6);
    assert_eq!(rig.store.slot, Some(1235));
    assert_eq!(rig.app.state().co2_setpoint, 1234.6);
}
