//! Blower → activation policy → duty cycle → outputs, end to end.

use chrono::NaiveTime;

use diffuser::app::events::AppEvent;
use diffuser::config::{SettingsPatch, SystemConfig};
use diffuser::fsm::{ActivationState, StateId};

use crate::mock_hw::{ManualClock, OutputCall, Rig};
use diffuser::app::ports::OutputChannel;

fn enabled_rig(duty_index: u8) -> Rig {
    let mut rig = Rig::new(Rig::enabled(duty_index));
    rig.hw.hvac_running = true;
    rig
}

fn hours(start: (u32, u32), end: (u32, u32)) -> SystemConfig {
    SystemConfig {
        business_hours_enabled: true,
        business_hours_start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        business_hours_end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        ..Rig::enabled(3)
    }
}

// ── Delay and duty timing ─────────────────────────────────────

#[test]
fn disabled_system_never_leaves_idle() {
    let mut rig = Rig::new(SystemConfig::default());
    rig.hw.hvac_running = true;
    rig.run_through(120);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.hw.pump && !rig.hw.fan);
}

#[test]
fn blower_must_run_ten_seconds_before_activation() {
    let mut rig = enabled_rig(3);

    rig.run_through(0);
    assert_eq!(rig.app.state(), StateId::Pending);
    assert!(matches!(
        rig.app.activation_state(),
        ActivationState::Pending { since } if since.as_secs() == 0
    ));

    rig.run_through(9);
    assert_eq!(rig.app.state(), StateId::Pending);
    assert!(!rig.hw.pump);

    rig.run_through(10);
    assert_eq!(rig.app.state(), StateId::Active);
    assert!(rig.hw.pump && rig.hw.fan);
}

#[test]
fn profile_three_alternates_sixty_on_sixty_off() {
    let mut rig = enabled_rig(3);
    let mut on = Vec::new();
    while rig.clock.secs() <= 200 {
        rig.step();
        on.push(rig.app.outputs_on());
    }

    assert!(on[..10].iter().all(|&o| !o), "off during the delay");
    assert!(on[10..70].iter().all(|&o| o), "first ON phase t=10..69");
    assert!(on[70..130].iter().all(|&o| !o), "OFF phase t=70..129");
    assert!(on[130..190].iter().all(|&o| o), "second ON phase t=130..189");
    assert!(!on[190]);

    // Runtime only counts time the outputs were actually on.
    let c = rig.app.counters();
    assert!((c.pump_runtime_seconds - 120.0).abs() < 1e-9);
    assert!((c.fan_runtime_seconds - 120.0).abs() < 1e-9);
}

#[test]
fn outputs_written_only_on_change() {
    let mut rig = enabled_rig(3);
    rig.run_through(200);

    // t=0 off, t=10 on, t=70 off, t=130 on, t=190 off: two channels each.
    assert_eq!(rig.hw.writes(), 10);
    assert_eq!(
        &rig.hw.calls[2..4],
        &[
            OutputCall::Set {
                channel: OutputChannel::Pump,
                on: true
            },
            OutputCall::Set {
                channel: OutputChannel::Fan,
                on: true
            },
        ]
    );
}

#[test]
fn blower_off_returns_to_idle_and_cuts_outputs() {
    let mut rig = enabled_rig(3);
    rig.run_through(21);
    assert_eq!(rig.app.state(), StateId::Active);

    rig.hw.hvac_running = false;
    rig.run_through(24);
    assert_eq!(rig.app.state(), StateId::Active, "next poll is at t=25");

    rig.run_through(25);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.hw.pump && !rig.hw.fan);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::HvacChanged(s) if !s.is_running)),
        1
    );
}

#[test]
fn short_blower_burst_never_activates() {
    let mut rig = enabled_rig(3);
    rig.run_through(4);
    rig.hw.hvac_running = false;
    rig.run_through(60);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::OutputsChanged { on: true })), 0);
}

#[test]
fn disable_mid_on_phase_restarts_cycle_from_on() {
    let mut rig = enabled_rig(3);
    rig.run_through(29);

    rig.handle
        .update_settings(&SettingsPatch {
            enabled: Some(false),
            ..Default::default()
        })
        .unwrap();
    rig.run_through(30);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(!rig.hw.pump && !rig.hw.fan, "forced off immediately");

    rig.run_through(39);
    rig.handle
        .update_settings(&SettingsPatch {
            enabled: Some(true),
            ..Default::default()
        })
        .unwrap();
    rig.run_through(40);
    assert_eq!(rig.app.state(), StateId::Pending, "delay starts over");

    rig.run_through(49);
    assert!(!rig.app.outputs_on());
    rig.run_through(50);
    assert!(rig.app.outputs_on(), "fresh ON phase at t=50");
    rig.run_through(109);
    assert!(rig.app.outputs_on(), "full 60 s ON, not the remainder");
    rig.run_through(110);
    assert!(!rig.app.outputs_on());
}

#[test]
fn duty_change_takes_effect_at_next_phase_boundary() {
    let mut rig = enabled_rig(3);
    rig.run_through(20);
    rig.handle
        .update_settings(&SettingsPatch {
            duty_cycle_index: Some(9),
            ..Default::default()
        })
        .unwrap();

    // Current ON phase started at t=10 under profile 9 now runs 360 s.
    rig.run_through(369);
    assert!(rig.app.outputs_on());
    rig.run_through(370);
    assert!(!rig.app.outputs_on());
    rig.run_through(399);
    assert!(!rig.app.outputs_on());
    rig.run_through(400);
    assert!(rig.app.outputs_on(), "30 s rest under profile 9");
}

// ── Business hours ────────────────────────────────────────────

#[test]
fn pending_waits_for_window_to_open() {
    let mut rig = Rig::with_clock(hours((9, 0), (17, 0)), ManualClock::starting_at(8, 59));
    rig.hw.hvac_running = true;

    rig.run_through(59);
    assert_eq!(rig.app.state(), StateId::Pending, "08:59:59 is outside");
    assert!(!rig.app.outputs_on());

    rig.run_through(60);
    assert_eq!(rig.app.state(), StateId::Active, "09:00:00 is inside");
    assert!(rig.app.outputs_on());
}

#[test]
fn overnight_window_blocks_midday() {
    let mut rig = Rig::with_clock(hours((22, 0), (6, 0)), ManualClock::new());
    rig.hw.hvac_running = true;
    rig.run_through(600);

    assert_eq!(rig.app.state(), StateId::Pending);
    assert_eq!(rig.hw.writes(), 2, "only the initial OFF write");
}

#[test]
fn window_closing_drops_active_to_pending_then_resumes() {
    let mut rig = Rig::with_clock(hours((22, 0), (6, 0)), ManualClock::starting_at(5, 59));
    rig.hw.hvac_running = true;

    rig.run_through(10);
    assert_eq!(rig.app.state(), StateId::Active);

    rig.run_through(60);
    assert_eq!(rig.app.state(), StateId::Active, "06:00:00 still inside");
    rig.run_through(61);
    assert_eq!(rig.app.state(), StateId::Pending);
    assert!(!rig.hw.pump && !rig.hw.fan);

    // Reopen the window: the blower has been on all along, so no new delay.
    rig.handle
        .update_settings(&SettingsPatch {
            business_hours_end: Some("07:00".into()),
            ..Default::default()
        })
        .unwrap();
    rig.run_through(62);
    assert_eq!(rig.app.state(), StateId::Active);
    assert!(rig.hw.pump);
}

#[test]
fn disabling_business_hours_lifts_the_gate() {
    let mut rig = Rig::with_clock(hours((22, 0), (6, 0)), ManualClock::new());
    rig.hw.hvac_running = true;
    rig.run_through(30);
    assert_eq!(rig.app.state(), StateId::Pending);

    rig.handle
        .update_settings(&SettingsPatch {
            business_hours_enabled: Some(false),
            ..Default::default()
        })
        .unwrap();
    rig.run_through(31);
    assert_eq!(rig.app.state(), StateId::Active);
}

// ── Events ────────────────────────────────────────────────────

#[test]
fn state_changes_are_reported_in_order() {
    let mut rig = enabled_rig(3);
    rig.run_through(10);

    let transitions: Vec<(StateId, StateId)> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (StateId::Idle, StateId::Pending),
            (StateId::Pending, StateId::Active)
        ]
    );
    assert!(matches!(rig.sink.events[0], AppEvent::Started(StateId::Idle)));
}

#[test]
fn telemetry_every_sixty_seconds() {
    let mut rig = enabled_rig(3);
    rig.run_through(125);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 3);
}
