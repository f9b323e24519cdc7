//! Oil accounting and the auto-disable on an empty bottle.

use std::time::Duration;

use diffuser::app::events::AppEvent;
use diffuser::config::{RuntimeCounters, SettingsPatch, StateRecord};
use diffuser::fsm::StateId;

use crate::mock_hw::{ManualClock, Rig};

/// Profile 9 (360 s on / 30 s off) with a 60 s tick, blower always on.
fn heavy_rig() -> Rig {
    let mut rig = Rig::new(Rig::enabled(9));
    rig.hw.hvac_running = true;
    rig.period = Duration::from_secs(60);
    rig
}

fn run_until_depleted(rig: &mut Rig) {
    for _ in 0..10_000 {
        rig.step();
        if rig.sink.depletions() > 0 {
            return;
        }
    }
    panic!("bottle never ran dry");
}

#[test]
fn fifty_hours_of_pump_time_empties_a_500ml_bottle() {
    let mut rig = heavy_rig();
    run_until_depleted(&mut rig);

    let c = rig.app.counters();
    assert!((c.pump_runtime_seconds - 180_000.0).abs() < 1e-6);
    assert!((c.oil_consumed_ml - 500.0).abs() < 1e-6);
    assert!(rig.app.oil_remaining_ml().abs() < 1e-9);
    assert!(rig.app.oil_percentage().abs() < 1e-9);

    // Same tick: system disabled, outputs off, policy suppressed.
    assert!(!rig.app.config().enabled);
    assert_eq!(rig.app.state(), StateId::SuppressedDepleted);
    assert!(!rig.hw.pump && !rig.hw.fan);

    let status = rig.handle.get_status();
    assert!(!status.enabled);
    assert_eq!(status.activation_state, "SuppressedDepleted");
    assert!(status.oil_remaining_ml.abs() < 1e-9);
    assert!((status.oil_used_ml - 500.0).abs() < 1e-9);
}

#[test]
fn depletion_alert_fires_exactly_once() {
    let mut rig = heavy_rig();
    run_until_depleted(&mut rig);
    rig.run(500);

    assert_eq!(rig.sink.depletions(), 1);
    let alert = rig.handle.take_depletion_alert().expect("alert raised");
    assert!((alert.oil_consumed_ml - 500.0).abs() < 1e-6);
    assert!((alert.oil_bottle_capacity_ml - 500.0).abs() < f64::EPSILON);
    assert!(rig.handle.take_depletion_alert().is_none(), "handed out once");

    // The auto-disable was persisted.
    let saved = rig.store.record.as_ref().expect("state saved");
    assert!(!saved.config.enabled);
}

#[test]
fn re_enabling_while_empty_stays_suppressed() {
    let mut rig = heavy_rig();
    run_until_depleted(&mut rig);

    rig.handle
        .update_settings(&SettingsPatch {
            enabled: Some(true),
            ..Default::default()
        })
        .unwrap();
    rig.run(20);

    assert!(rig.app.config().enabled, "request accepted");
    assert_eq!(rig.app.state(), StateId::SuppressedDepleted);
    assert!(!rig.hw.pump);
    assert_eq!(rig.sink.depletions(), 1, "no second alert");
}

#[test]
fn reset_after_refill_restores_full_bottle() {
    let mut rig = heavy_rig();
    run_until_depleted(&mut rig);
    rig.period = Duration::from_secs(1);

    rig.handle.reset_counters().unwrap();
    rig.step();
    let status = rig.handle.get_status();
    assert!((status.oil_percentage - 100.0).abs() < f64::EPSILON);
    assert!(status.pump_runtime_minutes.abs() < f64::EPSILON);
    assert!(status.fan_runtime_minutes.abs() < f64::EPSILON);
    assert_eq!(
        rig.app.state(),
        StateId::SuppressedDepleted,
        "still disabled after reset"
    );
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::CountersReset)), 1);

    rig.handle
        .update_settings(&SettingsPatch {
            enabled: Some(true),
            ..Default::default()
        })
        .unwrap();
    rig.step();
    assert_eq!(rig.app.state(), StateId::Idle);
    rig.step();
    assert_eq!(rig.app.state(), StateId::Pending);
    rig.run(10);
    assert_eq!(rig.app.state(), StateId::Active);
    assert!(rig.hw.pump);
}

#[test]
fn second_bottle_alerts_again() {
    let mut rig = heavy_rig();
    run_until_depleted(&mut rig);

    rig.handle.reset_counters().unwrap();
    rig.handle
        .update_settings(&SettingsPatch {
            enabled: Some(true),
            oil_bottle_capacity_ml: Some(10.0),
            ..Default::default()
        })
        .unwrap();
    // 10 mL at 10 mL/h is one hour of pump time.
    for _ in 0..1_000 {
        rig.step();
        if rig.sink.depletions() == 2 {
            break;
        }
    }
    assert_eq!(rig.sink.depletions(), 2);
    assert!((rig.app.counters().pump_runtime_seconds - 3600.0).abs() < 1e-6);
}

#[test]
fn shrinking_capacity_below_consumption_depletes() {
    let mut rig = Rig::new(Rig::enabled(9));
    rig.hw.hvac_running = true;
    rig.run_through(400);
    let used = rig.app.counters().oil_consumed_ml;
    assert!(used > 0.0);

    rig.handle
        .update_settings(&SettingsPatch {
            oil_bottle_capacity_ml: Some(used / 2.0),
            ..Default::default()
        })
        .unwrap();
    rig.step();

    assert_eq!(rig.sink.depletions(), 1);
    assert_eq!(rig.app.state(), StateId::SuppressedDepleted);
    assert!(!rig.app.config().enabled);
}

#[test]
fn restart_with_empty_bottle_does_not_realert() {
    let record = StateRecord {
        config: Rig::enabled(3),
        counters: RuntimeCounters {
            pump_runtime_seconds: 180_000.0,
            fan_runtime_seconds: 180_000.0,
            oil_consumed_ml: 500.0,
        },
    };
    let mut rig = Rig::build(record, Vec::new(), ManualClock::new());
    rig.hw.hvac_running = true;
    rig.run_through(60);

    assert_eq!(rig.app.state(), StateId::SuppressedDepleted);
    assert_eq!(rig.sink.depletions(), 0);
    assert!(rig.handle.take_depletion_alert().is_none());
    assert!(!rig.hw.pump);
}

#[test]
fn usage_rate_change_keeps_consumed_oil() {
    let mut rig = Rig::new(Rig::enabled(9));
    rig.hw.hvac_running = true;
    rig.run_through(370); // 360 s of pump time at 10 mL/h
    let before = rig.app.counters().oil_consumed_ml;
    assert!((before - 1.0).abs() < 1e-9);

    rig.handle
        .update_settings(&SettingsPatch {
            oil_usage_rate_ml_per_hour: Some(36.0),
            ..Default::default()
        })
        .unwrap();
    rig.step();
    assert!(
        (rig.app.counters().oil_consumed_ml - before).abs() < 1e-9,
        "no retroactive recalculation"
    );

    // Next ON phase (t=400..759) accrues at the new rate.
    rig.run_through(760);
    let after = rig.app.counters().oil_consumed_ml;
    assert!((after - (before + 3.6)).abs() < 1e-6, "got {after}");
}
