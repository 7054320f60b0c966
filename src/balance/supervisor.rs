//! Balance supervisor
//!
//! Fixed-rate control loop and its safety/supervisory state machine. Each
//! cycle: enforce the sampling cadence, read the filtered orientation,
//! check the safety cutoff, run the PID, map and apply the motor command,
//! emit telemetry, and poll for a user stop. Every exit path — safety
//! trip, sensor failure, user stop — leaves the motors stopped before the
//! session returns.

use crate::balance::mapper::MotorMapper;
use crate::balance::pid::PidRegulator;
use crate::drivers::Drive;
use crate::error::{Error, Result};
use crate::estimator::OrientationEstimator;
use crate::shared::SharedParams;
use crate::streaming::messages::TelemetrySample;
use crate::streaming::TelemetrySink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Supervisor lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No session has run yet
    Idle,
    /// Control loop active
    Running,
    /// Session ended by the tilt cutoff or a sensor failure
    SafetyStopped,
    /// Session ended by an external stop request
    UserStopped,
}

/// Why a session ended (the non-error outcomes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopReason {
    /// External cancel signal honored within one cycle
    UserRequested,
    /// Tilt exceeded the safety limit; the robot is considered fallen
    SafetyLimit {
        /// Roll at the moment of the trip (degrees)
        roll: f32,
    },
}

/// Orchestrates estimator, regulator, mapper, and drive at a fixed cadence
pub struct BalanceSupervisor {
    estimator: OrientationEstimator,
    drive: Drive,
    pid: PidRegulator,
    mapper: MotorMapper,
    params: SharedParams,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    state: SupervisorState,
}

impl BalanceSupervisor {
    pub fn new(estimator: OrientationEstimator, drive: Drive, params: SharedParams) -> Self {
        Self {
            estimator,
            drive,
            pid: PidRegulator::new(),
            mapper: MotorMapper::new(),
            params,
            telemetry: None,
            state: SupervisorState::Idle,
        }
    }

    /// Attach a telemetry sink; samples are pushed fire-and-forget
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Run one balancing session until it ends.
    ///
    /// `cancel` is polled non-blockingly once per cycle; setting it stops
    /// the motors within one cycle's latency. Calling `run` again after a
    /// terminal state starts a fresh session with reset PID state and
    /// direction memory.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<StopReason> {
        self.pid.reset();
        self.mapper.clear();
        self.state = SupervisorState::Running;
        log::info!("Supervisor: balancing session started");

        let outcome = self.control_loop(cancel);

        // Motors stop on every path before the session reports its end
        if let Err(e) = self.drive.stop() {
            log::error!("Supervisor: failed to stop motors: {}", e);
        }

        match &outcome {
            Ok(StopReason::UserRequested) => {
                self.state = SupervisorState::UserStopped;
                log::info!("Supervisor: session stopped by user request");
            }
            Ok(StopReason::SafetyLimit { roll }) => {
                self.state = SupervisorState::SafetyStopped;
                log::error!(
                    "Supervisor: safety stop at roll {:.2}°, robot considered fallen",
                    roll
                );
            }
            Err(e) => {
                self.state = SupervisorState::SafetyStopped;
                log::error!("Supervisor: session aborted: {}", e);
            }
        }

        outcome
    }

    fn control_loop(&mut self, cancel: &AtomicBool) -> Result<StopReason> {
        let mut last_cycle = Instant::now();
        let mut last_status_log = Instant::now();

        loop {
            // One snapshot per cycle; no per-field re-locking
            let params = self.params.snapshot();

            // Fixed-rate sampler: sleep out the remainder of the period
            let sample_time = Duration::from_secs_f32(params.sample_time);
            let elapsed = last_cycle.elapsed();
            if elapsed < sample_time {
                thread::sleep(sample_time - elapsed);
            }
            let now = Instant::now();
            let dt = now.duration_since(last_cycle).as_secs_f32();
            last_cycle = now;

            // A failed read ends the session; never balance on stale data
            let orientation = self.estimator.read(&params)?;

            // Safety cutoff precedes any actuation and cannot be disabled
            if orientation.roll.abs() > params.safe_tilt_limit {
                return Ok(StopReason::SafetyLimit {
                    roll: orientation.roll,
                });
            }

            let output =
                self.pid
                    .compute(orientation.roll, orientation.angular_velocity, dt, &params);
            let command = self.mapper.map(output, &params);
            self.drive
                .apply(&command)
                .map_err(|e| Error::Motor(e.to_string()))?;

            if let Some(sink) = &self.telemetry {
                let terms = self.pid.terms();
                sink.publish(&TelemetrySample {
                    timestamp_us: timestamp_us(),
                    actual_angle: orientation.roll,
                    target_angle: params.setpoint,
                    error: params.setpoint - orientation.roll,
                    angular_velocity: orientation.angular_velocity,
                    p_term: terms.p,
                    i_term: terms.i,
                    d_term: terms.d,
                    pid_output: output,
                    motor_output: command.speed,
                    direction: command.direction,
                });
            }

            if last_status_log.elapsed() >= Duration::from_millis(500) {
                log::debug!(
                    "Supervisor: roll={:.2}° rate={:.2}°/s output={:.2} motor={:.2}% {}",
                    orientation.roll,
                    orientation.angular_velocity,
                    output,
                    command.speed,
                    command.direction
                );
                last_status_log = now;
            }

            if cancel.load(Ordering::Relaxed) {
                return Ok(StopReason::UserRequested);
            }
        }
    }
}

fn timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
