//! End-to-end balancing sessions with mock drivers
//!
//! Each test runs a full supervisor session and asserts on the recorded
//! motor events and the terminal state. Sample times are shortened so a
//! session finishes in milliseconds.

use parking_lot::Mutex;
use santulan::app::{BalanceApp, StreamingAddresses};
use santulan::balance::{BalanceSupervisor, StopReason, SupervisorState};
use santulan::config::BalanceConfig;
use santulan::drivers::mock::{MockImu, MockMotor, MotorEvent, MotorLog};
use santulan::drivers::Drive;
use santulan::error::Error;
use santulan::estimator::OrientationEstimator;
use santulan::shared::SharedParams;
use santulan::streaming::{TelemetrySample, TelemetrySink};
use santulan::types::{CalibrationOffsets, Direction, ImuSample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Accel vector whose tilt estimate is `deg`, upright mounting
fn accel_for_tilt(deg: f32) -> [f32; 3] {
    let theta = deg.to_radians();
    [-9.81 * theta.sin(), 0.0, 9.81 * theta.cos()]
}

fn test_config() -> BalanceConfig {
    let mut config = BalanceConfig::default();
    config.imu_upside_down = false;
    config.sample_time = 0.001;
    config
}

fn supervisor_with(
    imu: MockImu,
    config: BalanceConfig,
) -> (BalanceSupervisor, MotorLog, SharedParams) {
    let estimator = OrientationEstimator::new(Box::new(imu), CalibrationOffsets::default());
    let (motor, log) = MockMotor::new();
    let drive = Drive::dual(Box::new(motor));
    let params = SharedParams::new(config);
    let supervisor = BalanceSupervisor::new(estimator, drive, params.clone());
    (supervisor, log, params)
}

#[test]
fn test_safety_trip_before_any_actuation() {
    // Tilt beyond the 45° limit on the very first cycle
    let imu = MockImu::constant(ImuSample::new(accel_for_tilt(50.0), [0.0, 0.0, 0.0]));
    let (mut supervisor, log, _params) = supervisor_with(imu, test_config());

    let cancel = AtomicBool::new(false);
    let reason = supervisor.run(&cancel).unwrap();

    match reason {
        StopReason::SafetyLimit { roll } => assert!((roll - 50.0).abs() < 0.5),
        other => panic!("expected safety stop, got {:?}", other),
    }
    assert_eq!(supervisor.state(), SupervisorState::SafetyStopped);

    // The cutoff fires before actuation; the only event is the final stop
    let events = log.lock();
    assert_eq!(events.as_slice(), &[MotorEvent::StopAll]);
}

#[test]
fn test_user_stop_honored_within_one_cycle() {
    let imu = MockImu::constant(ImuSample::new(accel_for_tilt(0.0), [0.0, 0.0, 0.0]));
    let (mut supervisor, log, _params) = supervisor_with(imu, test_config());

    let cancel = AtomicBool::new(true);
    let reason = supervisor.run(&cancel).unwrap();

    assert_eq!(reason, StopReason::UserRequested);
    assert_eq!(supervisor.state(), SupervisorState::UserStopped);

    // Exactly one cycle ran: both sides commanded, then the final stop
    let events = log.lock();
    assert_eq!(events.len(), 3);
    assert_eq!(*events.last().unwrap(), MotorEvent::StopAll);
    for event in &events[..2] {
        match event {
            MotorEvent::Set {
                speed, direction, ..
            } => {
                // Upright and still: output is inside the deadband
                assert_eq!(*speed, 0.0);
                assert_eq!(*direction, Direction::Stop);
            }
            other => panic!("unexpected event before stop: {:?}", other),
        }
    }
}

#[test]
fn test_sensor_failure_aborts_with_motors_stopped() {
    let imu = MockImu::constant(ImuSample::new(accel_for_tilt(0.0), [0.0, 0.0, 0.0]))
        .failing_at(2);
    let (mut supervisor, log, _params) = supervisor_with(imu, test_config());

    let cancel = AtomicBool::new(false);
    let err = supervisor.run(&cancel).unwrap_err();

    assert!(matches!(err, Error::Sensor(_)));
    assert_eq!(supervisor.state(), SupervisorState::SafetyStopped);
    assert_eq!(*log.lock().last().unwrap(), MotorEvent::StopAll);
}

struct CollectSink {
    samples: Mutex<Vec<TelemetrySample>>,
}

impl TelemetrySink for CollectSink {
    fn publish(&self, sample: &TelemetrySample) {
        self.samples.lock().push(sample.clone());
    }
}

#[test]
fn test_telemetry_published_every_cycle() {
    // 10° of tilt: kp=5 gives -50, inside the 60% deadband, so the motors
    // hold still while telemetry reports the regulator's raw output
    let imu = MockImu::constant(ImuSample::new(accel_for_tilt(10.0), [0.0, 0.0, 0.0]));
    let (supervisor, _log, _params) = supervisor_with(imu, test_config());

    let sink = Arc::new(CollectSink {
        samples: Mutex::new(Vec::new()),
    });
    let mut supervisor =
        supervisor.with_telemetry(Arc::clone(&sink) as Arc<dyn TelemetrySink>);

    let cancel = AtomicBool::new(true);
    supervisor.run(&cancel).unwrap();

    let samples = sink.samples.lock();
    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert!((sample.actual_angle - 10.0).abs() < 0.1);
    assert_eq!(sample.target_angle, 0.0);
    assert!((sample.error + 10.0).abs() < 0.1);
    assert!(sample.pid_output < -45.0);
    assert_eq!(sample.motor_output, 0.0);
    assert_eq!(sample.direction, Direction::Stop);
    assert!(sample.timestamp_us > 0);
}

#[test]
fn test_session_restartable_after_safety_stop() {
    // First cycle trips the cutoff; subsequent samples are upright
    let imu = MockImu::with_samples(vec![
        ImuSample::new(accel_for_tilt(50.0), [0.0, 0.0, 0.0]),
        ImuSample::new(accel_for_tilt(0.0), [0.0, 0.0, 0.0]),
    ]);
    let (mut supervisor, log, _params) = supervisor_with(imu, test_config());

    let cancel = AtomicBool::new(false);
    let reason = supervisor.run(&cancel).unwrap();
    assert!(matches!(reason, StopReason::SafetyLimit { .. }));
    assert_eq!(supervisor.state(), SupervisorState::SafetyStopped);

    // A fresh run leaves the terminal state behind and honors the stop
    cancel.store(true, Ordering::Relaxed);
    let reason = supervisor.run(&cancel).unwrap();
    assert_eq!(reason, StopReason::UserRequested);
    assert_eq!(supervisor.state(), SupervisorState::UserStopped);
    assert_eq!(*log.lock().last().unwrap(), MotorEvent::StopAll);
}

#[test]
fn test_run_returns_when_tuning_port_unavailable() {
    // Hold the tuning port so the daemon's accept loop fails to bind
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let tuning = occupied.local_addr().unwrap().to_string();

    let dir = tempfile::tempdir().unwrap();
    let imu = MockImu::constant(ImuSample::new(accel_for_tilt(0.0), [0.0, 0.0, 0.0]));
    let (motor, _log) = MockMotor::new();
    let mut app = BalanceApp::new(
        test_config(),
        dir.path().join("santulan.toml"),
        Box::new(imu),
        Drive::dual(Box::new(motor)),
        StreamingAddresses {
            telemetry: "127.0.0.1:0".to_string(),
            tuning,
        },
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(app.run());
    });

    // The bind failure must surface as an error, not hang the daemon on
    // its supervisor thread
    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("run did not return after tuning bind failure");
    assert!(result.is_err());
}

#[test]
fn test_live_parameter_update_takes_effect_mid_session() {
    // Widen the safety limit before the session starts; the 50° tilt that
    // would have tripped the default limit now runs until cancelled
    let imu = MockImu::constant(ImuSample::new(accel_for_tilt(50.0), [0.0, 0.0, 0.0]));
    let mut config = test_config();
    config.safe_tilt_limit = 80.0;
    let (mut supervisor, log, params) = supervisor_with(imu, test_config());
    params.replace(config);

    let cancel = AtomicBool::new(true);
    let reason = supervisor.run(&cancel).unwrap();
    assert_eq!(reason, StopReason::UserRequested);

    // 50° at kp=5 saturates the output; past the deadband, motors drive
    let events = log.lock();
    match events[0] {
        MotorEvent::Set {
            speed, direction, ..
        } => {
            assert_eq!(speed, 100.0);
            assert_eq!(direction, Direction::Reverse);
        }
        other => panic!("unexpected first event: {:?}", other),
    }
}
