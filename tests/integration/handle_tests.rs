//! The external interface: status, history, settings and reset requests.

use std::thread;

use diffuser::app::events::AppEvent;
use diffuser::app::handle::ControlHandle;
use diffuser::config::{SettingsPatch, SystemConfig};
use diffuser::error::{RequestError, ValidationError};

use crate::mock_hw::Rig;

#[test]
fn status_available_before_first_tick() {
    let rig = Rig::new(SystemConfig::default());
    let s = rig.handle.get_status();
    assert!(!s.enabled);
    assert_eq!(s.duty_cycle, 1);
    assert_eq!(s.activation_state, "Idle");
    assert!((s.oil_percentage - 100.0).abs() < f64::EPSILON);
    assert!((s.oil_remaining_ml - 500.0).abs() < f64::EPSILON);
    assert!(rig.handle.get_history().is_empty());
}

#[test]
fn status_serializes_with_wire_field_names() {
    let mut rig = Rig::new(Rig::enabled(3));
    rig.hw.hvac_running = true;
    rig.run_through(15);

    let json = serde_json::to_value(rig.handle.get_status()).unwrap();
    assert_eq!(json["enabled"], true);
    assert_eq!(json["duty_cycle"], 3);
    assert_eq!(json["duty_cycle_label"], "60s / 60s");
    assert_eq!(json["hvac_fan_state"], true);
    assert_eq!(json["pump_on"], true);
    assert_eq!(json["activation_state"], "Active");
    assert_eq!(json["business_hours_start"], "09:00");
    assert_eq!(json["pump_runtime_minutes"], 0.1);
    assert!(json["oil_used_ml"].is_number());
}

#[test]
fn invalid_settings_rejected_without_side_effects() {
    let mut rig = Rig::new(Rig::enabled(3));
    rig.step();

    let bad = [
        (
            SettingsPatch {
                duty_cycle_index: Some(10),
                ..Default::default()
            },
            RequestError::Invalid(ValidationError::DutyCycleIndex(10)),
        ),
        (
            SettingsPatch {
                enabled: Some(false),
                oil_usage_rate_ml_per_hour: Some(-1.0),
                ..Default::default()
            },
            RequestError::Invalid(ValidationError::NotPositive {
                field: "oil_usage_rate_ml_per_hour",
                value: -1.0,
            }),
        ),
    ];
    for (patch, expected) in bad {
        assert_eq!(rig.handle.update_settings(&patch), Err(expected));
    }

    let malformed = SettingsPatch {
        business_hours_start: Some("25:00".into()),
        ..Default::default()
    };
    assert!(matches!(
        rig.handle.update_settings(&malformed),
        Err(RequestError::Invalid(ValidationError::TimeOfDay { .. }))
    ));

    rig.step();
    assert!(rig.app.config().enabled, "partial patch not applied");
    assert_eq!(rig.app.config(), &Rig::enabled(3));
    assert_eq!(rig.store.saves, 0);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::SettingsApplied(_))),
        0
    );
}

#[test]
fn requests_apply_in_arrival_order() {
    let mut rig = Rig::new(Rig::enabled(3));
    for i in [4, 7, 2] {
        rig.handle
            .update_settings(&SettingsPatch {
                duty_cycle_index: Some(i),
                ..Default::default()
            })
            .unwrap();
    }
    rig.step();
    assert_eq!(rig.app.config().duty_cycle.index(), 2);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::SettingsApplied(_))),
        3
    );
}

#[test]
fn full_queue_reports_busy_until_drained() {
    let mut rig = Rig::new(Rig::enabled(3));
    let mut accepted = 0;
    while rig.handle.reset_counters().is_ok() {
        accepted += 1;
    }
    assert!(accepted > 0);
    assert_eq!(rig.handle.reset_counters(), Err(RequestError::Busy));

    rig.step();
    assert!(rig.handle.reset_counters().is_ok());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::CountersReset)),
        accepted
    );
}

#[test]
fn handles_on_other_threads_are_serialized() {
    let mut rig = Rig::new(Rig::enabled(3));
    rig.hw.hvac_running = true;

    let writer = {
        let handle = rig.handle.clone();
        thread::spawn(move || {
            for i in 0..40u8 {
                let patch = SettingsPatch {
                    duty_cycle_index: Some(i % 10),
                    ..Default::default()
                };
                loop {
                    match handle.update_settings(&patch) {
                        Ok(()) => break,
                        Err(RequestError::Busy) => thread::yield_now(),
                        Err(e) => panic!("unexpected rejection: {e}"),
                    }
                }
                // Every read is a whole snapshot from some tick.
                let s = handle.get_status();
                assert_eq!(
                    s.duty_cycle_label,
                    ControlHandle::duty_cycles()[s.duty_cycle as usize].label
                );
            }
        })
    };

    while !writer.is_finished() {
        rig.step();
    }
    writer.join().unwrap();
    rig.step();

    assert_eq!(rig.app.config().duty_cycle.index(), 9);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::SettingsApplied(_))),
        40
    );
}

#[test]
fn duty_cycle_table_is_exposed() {
    let list = ControlHandle::duty_cycles();
    let pairs: Vec<(u32, u32)> = list.iter().map(|d| (d.on, d.off)).collect();
    assert_eq!(
        pairs,
        vec![
            (60, 240),
            (60, 120),
            (60, 90),
            (60, 60),
            (60, 45),
            (60, 30),
            (90, 30),
            (120, 30),
            (240, 30),
            (360, 30),
        ]
    );
    assert!(list.iter().enumerate().all(|(i, d)| d.index as usize == i));
}
