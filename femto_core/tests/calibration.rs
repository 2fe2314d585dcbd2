use std::sync::Arc;
use std::time::Duration;

use femto_core::actuator::{PhaseActuator, TriggerChannel};
use femto_core::calibration::{SweepPoint, fit_sweep, linspace};
use femto_core::config::{ActuatorCfg, CalibrationCfg, CounterCfg, RfCfg, Timeouts};
use femto_core::sawtooth::predict;
use femto_core::{CalibrationOutcome, Calibrator, Link, LockError, TimeIntervalReader};
use femto_hardware::{SimConnection, SimParams, SimulatedLocker};
use femto_traits::{LockerChannels, ManualClock};
use rstest::rstest;

const PERIOD: f64 = 1.0 / 0.068;
const CANDIDATES: usize = 10_000;

fn synthetic_sweep(delay: f64, offset: f64, trigger: f64, points: usize, noise: f64) -> Vec<SweepPoint> {
    linspace(0.0, 30.0, points)
        .into_iter()
        .enumerate()
        .map(|(i, position_ns)| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            SweepPoint {
                position_ns,
                time_ns: predict(position_ns, trigger, delay, offset, PERIOD).time_ns + sign * noise,
                good: true,
            }
        })
        .collect()
}

#[rstest]
#[case(21.7, 4.2, 0.0)]
#[case(3.0, 11.9, 0.0)]
#[case(40.25, 0.75, -8.4)]
fn fit_recovers_known_parameters(#[case] delay: f64, #[case] offset: f64, #[case] trigger: f64) {
    let points = 50;
    let noise = 0.001;
    let sweep = synthetic_sweep(delay, offset, trigger, points, noise);
    let fit = fit_sweep(&sweep, trigger, PERIOD, CANDIDATES).unwrap();

    let step = PERIOD / (CANDIDATES - 1) as f64;
    let spacing = 30.0 / (points - 1) as f64;
    assert!(
        fit.delay_ns >= delay - noise && fit.delay_ns <= delay + spacing + noise,
        "delay {} vs {delay}",
        fit.delay_ns
    );
    assert!(
        (fit.offset_ns - offset).abs() <= step + noise,
        "offset {} vs {offset}",
        fit.offset_ns
    );
    assert_eq!(fit.good_points, points);
    assert!(fit.rms_ns < 0.01);
}

#[test]
fn bad_points_are_left_out_of_the_fit() {
    let mut sweep = synthetic_sweep(21.7, 4.2, 0.0, 50, 0.0);
    for p in sweep.iter_mut().step_by(3) {
        p.good = false;
        p.time_ns = 0.0;
    }
    let fit = fit_sweep(&sweep, 0.0, PERIOD, CANDIDATES).unwrap();
    assert!((fit.offset_ns - 4.2).abs() < 0.002);
    assert!(fit.delay_ns > 21.6);
}

fn rig(points: usize) -> (SimulatedLocker, Link<SimConnection>, PhaseActuator, Calibrator) {
    let ch = LockerChannels::new("LAS:SIM:", "EVR:SIM:TDES", "LAS:SIM:VIT:BKT_DLY");
    let sim = SimulatedLocker::new(ch.clone(), SimParams::default());
    let mut link = Link::new(
        sim.connect(),
        Arc::new(ch),
        Timeouts::default(),
        Arc::new(ManualClock::new()),
    );
    let actuator = PhaseActuator::connect(&mut link, ActuatorCfg::default()).unwrap();
    let cfg = CalibrationCfg {
        points,
        settle: Duration::from_millis(500),
        ..CalibrationCfg::default()
    };
    (sim, link, actuator, Calibrator::new(cfg, PERIOD))
}

#[test]
fn sweep_on_the_simulator_finds_the_installation() {
    let (sim, mut link, mut actuator, calibrator) = rig(50);
    let mut reader = TimeIntervalReader::new(CounterCfg::default());
    let trigger = TriggerChannel::new(&RfCfg::default());
    let mut always = |_: &mut Link<SimConnection>| -> Result<bool, LockError> { Ok(true) };

    let outcome = calibrator
        .run(&mut link, &mut actuator, &mut reader, &trigger, &mut always)
        .unwrap();
    let CalibrationOutcome::Fitted(fit) = outcome else {
        panic!("expected a fit, got {outcome:?}");
    };
    let truth = sim.params();
    assert!((fit.offset_ns - truth.offset_ns).abs() < 0.01, "offset {}", fit.offset_ns);
    assert!(fit.delay_ns > truth.delay_ns - 0.01 && fit.delay_ns < truth.delay_ns + 0.65);
    // back at the start of the sweep
    assert_eq!(sim.motor_commands().last().copied(), Some(0.0));
}

#[test]
fn cancelled_sweep_returns_home_without_fitting() {
    let (sim, mut link, mut actuator, calibrator) = rig(20);
    let mut reader = TimeIntervalReader::new(CounterCfg::default());
    let trigger = TriggerChannel::new(&RfCfg::default());
    let mut seen = 0;
    let mut three_points = |_: &mut Link<SimConnection>| -> Result<bool, LockError> {
        seen += 1;
        Ok(seen <= 3)
    };

    let outcome = calibrator
        .run(&mut link, &mut actuator, &mut reader, &trigger, &mut three_points)
        .unwrap();
    assert_eq!(outcome, CalibrationOutcome::Cancelled);
    let moves = sim.motor_commands();
    // home, three swept points, home again
    assert_eq!(moves.len(), 5);
    assert_eq!(moves.last().copied(), Some(0.0));
}

#[test]
fn frozen_counter_is_insufficient_data() {
    let (sim, mut link, mut actuator, calibrator) = rig(10);
    let mut reader = TimeIntervalReader::new(CounterCfg::default());
    let trigger = TriggerChannel::new(&RfCfg::default());
    // one reading lands, then nothing new
    reader.read(&mut link).unwrap();
    sim.freeze_counter(true);
    let mut always = |_: &mut Link<SimConnection>| -> Result<bool, LockError> { Ok(true) };

    let err = calibrator
        .run(&mut link, &mut actuator, &mut reader, &trigger, &mut always)
        .unwrap_err();
    assert_eq!(err, LockError::InsufficientData { good: 0 });
}
