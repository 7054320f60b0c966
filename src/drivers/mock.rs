//! Mock drivers for hardware-free testing
//!
//! `MockImu` replays scripted samples (repeating the last one when the
//! script runs out) and can inject a read failure at a chosen point.
//! `MockMotor` records every command it receives so tests can assert on
//! the exact actuation sequence.

use crate::error::{Error, Result};
use crate::types::{Direction, ImuSample, Side};
use parking_lot::Mutex;
use std::sync::Arc;

use super::imu::ImuSensor;
use super::motor::MotorDriver;

/// Scripted IMU. Each `read_accel` advances to the next scripted sample;
/// the following `read_gyro` returns the matching rate so one control
/// cycle consumes exactly one sample.
pub struct MockImu {
    samples: Vec<ImuSample>,
    index: usize,
    current: ImuSample,
    fail_at: Option<usize>,
    reads: usize,
}

impl MockImu {
    /// Replay the given samples, repeating the last one indefinitely
    pub fn with_samples(samples: Vec<ImuSample>) -> Self {
        assert!(!samples.is_empty(), "MockImu needs at least one sample");
        let current = samples[0];
        Self {
            samples,
            index: 0,
            current,
            fail_at: None,
            reads: 0,
        }
    }

    /// Replay one sample forever
    pub fn constant(sample: ImuSample) -> Self {
        Self::with_samples(vec![sample])
    }

    /// Fail every read from the `n`-th cycle onwards (0 = immediately)
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    fn advance(&mut self) -> Result<()> {
        if let Some(n) = self.fail_at {
            if self.reads >= n {
                return Err(Error::Sensor("mock bus failure".to_string()));
            }
        }
        self.current = self.samples[self.index.min(self.samples.len() - 1)];
        self.index += 1;
        self.reads += 1;
        Ok(())
    }
}

impl ImuSensor for MockImu {
    fn read_accel(&mut self) -> Result<[f32; 3]> {
        self.advance()?;
        Ok(self.current.accel)
    }

    fn read_gyro(&mut self) -> Result<[f32; 3]> {
        Ok(self.current.gyro)
    }
}

/// One recorded motor event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorEvent {
    Set {
        side: Side,
        speed: f32,
        direction: Direction,
    },
    StopAll,
}

/// Shared log of motor events, readable while the drive owns the driver
pub type MotorLog = Arc<Mutex<Vec<MotorEvent>>>;

/// Recording motor driver
pub struct MockMotor {
    log: MotorLog,
}

impl MockMotor {
    /// Create a mock motor plus a handle to its event log
    pub fn new() -> (Self, MotorLog) {
        let log: MotorLog = Arc::new(Mutex::new(Vec::new()));
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl MotorDriver for MockMotor {
    fn set_speed(&mut self, side: Side, speed: f32, direction: Direction) -> Result<()> {
        self.log.lock().push(MotorEvent::Set {
            side,
            speed,
            direction,
        });
        Ok(())
    }

    fn stop_all(&mut self) -> Result<()> {
        self.log.lock().push(MotorEvent::StopAll);
        Ok(())
    }
}
