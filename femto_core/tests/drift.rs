use std::sync::Arc;

use femto_core::Link;
use femto_core::config::{DriftCfg, Timeouts};
use femto_core::drift::{DriftInputs, DriftIntegrator};
use femto_hardware::{SimParams, SimulatedLocker};
use femto_traits::{LockerChannels, ManualClock, Value};
use rstest::rstest;

fn clamped(direction: f64) -> DriftIntegrator {
    DriftIntegrator::new(DriftCfg {
        enabled: true,
        direction,
        input_scale: 0.001,
        clamp_ns: 0.001,
    })
}

#[rstest]
#[case(1.0, 10.0, 0.001)]
#[case(-1.0, 10.0, -0.001)]
#[case(1.0, -10.0, -0.001)]
#[case(-1.0, -10.0, 0.001)]
fn ten_ps_is_clamped_to_one_ps(#[case] direction: f64, #[case] signal_ps: f64, #[case] expected_ns: f64) {
    let mut d = clamped(direction);
    assert!(d.update(&DriftInputs {
        signal: signal_ps,
        offset_ns: 0.0,
        gain: 1.0,
        smoothing: 1.0,
        accumulate: true,
    }));
    assert_eq!(d.correction_ns(), expected_ns);
    assert_eq!(d.apply(5.0), 5.0 - expected_ns);
}

#[test]
fn smoothing_never_escapes_the_clamp() {
    let mut d = clamped(1.0);
    for i in 0..200 {
        d.update(&DriftInputs {
            signal: 10.0 + f64::from(i),
            offset_ns: 0.0,
            gain: 3.0,
            smoothing: 2.0,
            accumulate: true,
        });
        assert!(d.correction_ns().abs() <= 0.001);
    }
    assert_eq!(d.correction_ns(), 0.001);
}

#[test]
fn run_publishes_the_clamped_value() {
    let ch = LockerChannels::new("LAS:SIM:", "EVR:SIM:TDES", "LAS:SIM:VIT:BKT_DLY");
    let sim = SimulatedLocker::new(ch.clone(), SimParams::default());
    sim.set(ch.drift_signal.name(), Value::Float(10.0));
    let mut link = Link::new(
        sim.connect(),
        Arc::new(ch.clone()),
        Timeouts::default(),
        Arc::new(ManualClock::new()),
    );
    let mut d = clamped(-1.0);
    let c = d.run(&mut link).unwrap();
    assert_eq!(c, -0.001);
    assert_eq!(sim.value(ch.drift_value.name()), Some(Value::Float(-0.001)));

    // an unchanged signal leaves the published value alone
    sim.set(ch.drift_value.name(), Value::Float(0.0));
    assert_eq!(d.run(&mut link).unwrap(), -0.001);
    assert_eq!(sim.value(ch.drift_value.name()), Some(Value::Float(0.0)));
}
