//! GPIO faults: the loop keeps running and holds the last known state.

use diffuser::app::events::AppEvent;
use diffuser::fsm::StateId;

use crate::mock_hw::Rig;

fn active_rig() -> Rig {
    let mut rig = Rig::new(Rig::enabled(3));
    rig.hw.hvac_running = true;
    rig.run_through(20);
    assert_eq!(rig.app.state(), StateId::Active);
    rig
}

#[test]
fn sense_failure_holds_last_blower_state() {
    let mut rig = active_rig();
    rig.hw.fail_reads = true;
    rig.hw.hvac_running = false;

    rig.run_through(80);
    assert_eq!(rig.app.state(), StateId::Active, "held ON through failures");
    assert!(rig.handle.get_status().hvac_fan_state);
    // The duty cycle keeps its own timing meanwhile.
    assert!(!rig.app.outputs_on(), "t=70..129 is the OFF phase");

    rig.hw.fail_reads = false;
    rig.run_through(84);
    assert_eq!(rig.app.state(), StateId::Active);
    rig.run_through(85);
    assert_eq!(rig.app.state(), StateId::Idle, "recovered read sees OFF");
}

#[test]
fn sense_failing_from_boot_never_activates() {
    let mut rig = Rig::new(Rig::enabled(3));
    rig.hw.hvac_running = true;
    rig.hw.fail_reads = true;
    rig.run_through(60);

    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.hw.samples, 13, "still polled every 5 s");
    assert!(!rig.hw.pump);
}

#[test]
fn output_failure_holds_state_and_retries() {
    let mut rig = Rig::new(Rig::enabled(3));
    rig.hw.hvac_running = true;
    rig.run_through(9);

    rig.hw.fail_writes = true;
    rig.run_through(20);
    assert_eq!(rig.app.state(), StateId::Active);
    assert!(!rig.hw.pump && !rig.hw.fan);
    let status = rig.handle.get_status();
    assert!(!status.pump_on && !status.fan_on, "status reports applied levels");
    assert!(
        rig.app.counters().pump_runtime_seconds.abs() < f64::EPSILON,
        "no runtime while the write fails"
    );

    rig.hw.fail_writes = false;
    rig.run_through(21);
    assert!(rig.hw.pump && rig.hw.fan);
    assert!(rig.handle.get_status().pump_on);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::OutputsChanged { on: true })),
        1
    );

    rig.run_through(31);
    assert!((rig.app.counters().pump_runtime_seconds - 10.0).abs() < 1e-9);
}

#[test]
fn shutdown_with_failing_store_still_cuts_outputs() {
    let mut rig = active_rig();
    rig.store.fail_saves = true;
    rig.shutdown();

    assert!(!rig.hw.pump && !rig.hw.fan);
    assert!(rig.app.is_dirty());
}
