//! Inverted-pendulum simulator
//!
//! A small physics plant implementing both collaborator traits, so the
//! daemon can run end to end without hardware. Real sensor-bus and PWM
//! integrations live out of tree and implement the same traits.

use crate::error::Result;
use crate::types::{Direction, Side};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use super::imu::ImuSensor;
use super::motor::MotorDriver;

const GRAVITY: f32 = 9.81;
/// Gravitational destabilization rate, (deg/s²) per sin(tilt)
const TIP_RATE: f32 = 550.0;
/// Restoring acceleration per unit of signed motor output, deg/s² per percent
const TORQUE_GAIN: f32 = 9.0;

struct PlantState {
    angle_deg: f32,
    rate_dps: f32,
    /// Signed motor output, -100..100 (forward positive)
    torque: f32,
    last_step: Instant,
}

impl PlantState {
    fn step(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_step).as_secs_f32().min(0.05);
        self.last_step = now;

        let accel = TIP_RATE * self.angle_deg.to_radians().sin() - TORQUE_GAIN * self.torque;
        self.rate_dps += accel * dt;
        self.angle_deg += self.rate_dps * dt;
    }
}

/// Handle to one simulated robot; split into its IMU and motor halves
pub struct SimRobot {
    state: Arc<Mutex<PlantState>>,
}

impl SimRobot {
    /// Create a plant starting at the given tilt
    pub fn new(initial_angle_deg: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlantState {
                angle_deg: initial_angle_deg,
                rate_dps: 0.0,
                torque: 0.0,
                last_step: Instant::now(),
            })),
        }
    }

    /// Split into the sensor and actuator halves sharing one plant
    pub fn split(self) -> (SimImu, SimMotor) {
        let imu = SimImu {
            state: Arc::clone(&self.state),
        };
        let motor = SimMotor { state: self.state };
        (imu, motor)
    }

    /// Current plant tilt in degrees
    pub fn angle(&self) -> f32 {
        self.state.lock().angle_deg
    }
}

/// Simulated IMU half: synthesizes accel/gyro from the plant tilt
pub struct SimImu {
    state: Arc<Mutex<PlantState>>,
}

impl ImuSensor for SimImu {
    fn read_accel(&mut self) -> Result<[f32; 3]> {
        let mut plant = self.state.lock();
        plant.step();
        let theta = plant.angle_deg.to_radians();
        // Gravity vector as seen by a sensor tilted by theta about the
        // forward axis: tilt estimate atan2(-ax, sqrt(ay²+az²)) recovers it.
        Ok([-GRAVITY * theta.sin(), 0.0, GRAVITY * theta.cos()])
    }

    fn read_gyro(&mut self) -> Result<[f32; 3]> {
        let plant = self.state.lock();
        Ok([plant.rate_dps.to_radians(), 0.0, 0.0])
    }
}

/// Simulated motor half: applies commands as restoring torque
pub struct SimMotor {
    state: Arc<Mutex<PlantState>>,
}

impl MotorDriver for SimMotor {
    fn set_speed(&mut self, _side: Side, speed: f32, direction: Direction) -> Result<()> {
        let signed = match direction {
            Direction::Forward => speed,
            Direction::Reverse => -speed,
            Direction::Stop => 0.0,
        };
        self.state.lock().torque = signed;
        Ok(())
    }

    fn stop_all(&mut self) -> Result<()> {
        self.state.lock().torque = 0.0;
        Ok(())
    }
}
