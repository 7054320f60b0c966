//! Orientation estimator
//!
//! Turns raw accelerometer/gyroscope samples into a filtered tilt angle
//! and angular rate. Per cycle: read one sample, subtract calibration
//! offsets, undo an upside-down mounting, compute the accelerometer tilt,
//! and blend it with the previous filtered value. The first read seeds the
//! filter from the instantaneous estimate so a session never starts with a
//! transient toward zero.

use crate::config::BalanceConfig;
use crate::drivers::ImuSensor;
use crate::error::{Error, Result};
use crate::types::{CalibrationOffsets, ImuSample, OrientationState};

/// Accelerometer readings are clipped to ±1 g per axis before the tilt
/// computation; transient spikes otherwise swing the estimate hard.
const ACCEL_CLIP: f32 = 9.81;

struct FilterState {
    roll: f32,
    angular_velocity: f32,
}

/// Stateful per-cycle orientation estimator owning the sensor collaborator
pub struct OrientationEstimator {
    sensor: Box<dyn ImuSensor>,
    offsets: CalibrationOffsets,
    filter: Option<FilterState>,
}

impl OrientationEstimator {
    /// Create an estimator with the calibration loaded at startup
    pub fn new(sensor: Box<dyn ImuSensor>, offsets: CalibrationOffsets) -> Self {
        Self {
            sensor,
            offsets,
            filter: None,
        }
    }

    /// Offsets in effect
    pub fn offsets(&self) -> CalibrationOffsets {
        self.offsets
    }

    /// Read one sample and update the filtered orientation.
    ///
    /// `params` supplies the live filter coefficient and mounting flag.
    /// A sensor failure propagates as [`Error::Sensor`]; no stale or zero
    /// substitute is ever produced.
    pub fn read(&mut self, params: &BalanceConfig) -> Result<OrientationState> {
        let accel = self.sensor.read_accel()?;
        let gyro_rad = self.sensor.read_gyro()?;

        let mut gyro = [0.0_f32; 3];
        for (out, v) in gyro.iter_mut().zip(gyro_rad) {
            *out = v.to_degrees();
        }

        let sample = correct_sample(
            ImuSample::new(accel, gyro),
            &self.offsets,
            params.imu_upside_down,
        );

        let tilt = accel_tilt_degrees(sample.accel);
        let rate = sample.gyro[0];

        let alpha = params.imu_filter_alpha;
        let state = match self.filter.take() {
            // First reading seeds the filter directly
            None => FilterState {
                roll: tilt,
                angular_velocity: rate,
            },
            Some(prev) => FilterState {
                roll: alpha * tilt + (1.0 - alpha) * prev.roll,
                angular_velocity: alpha * rate + (1.0 - alpha) * prev.angular_velocity,
            },
        };

        let roll = normalize_angle_degrees(state.roll);
        let angular_velocity = state.angular_velocity;
        self.filter = Some(FilterState {
            roll,
            angular_velocity,
        });

        Ok(OrientationState {
            roll,
            angular_velocity,
        })
    }

    /// Re-derive bias offsets by averaging `samples` readings at rest.
    ///
    /// The robot must be held upright and still. Gravity is expected on
    /// the corrected Z axis; whatever else the sensor reports is bias.
    ///
    /// Startup-only: the tuning channel has no recalibration command, so
    /// integrations must calibrate before handing the estimator to the
    /// supervisor and persist the offsets to the configuration file.
    pub fn calibrate(&mut self, samples: usize, params: &BalanceConfig) -> Result<CalibrationOffsets> {
        if samples == 0 {
            return Err(Error::InvalidParameter(
                "calibration needs at least one sample".to_string(),
            ));
        }

        let mut accel_sum = [0.0_f64; 3];
        let mut gyro_sum = [0.0_f64; 3];
        for _ in 0..samples {
            let accel = self.sensor.read_accel()?;
            let gyro = self.sensor.read_gyro()?;
            for i in 0..3 {
                accel_sum[i] += accel[i] as f64;
                gyro_sum[i] += gyro[i].to_degrees() as f64;
            }
        }

        let n = samples as f64;
        let mut accel_offset = [0.0_f32; 3];
        let mut gyro_offset = [0.0_f32; 3];
        for i in 0..3 {
            accel_offset[i] = (accel_sum[i] / n) as f32;
            gyro_offset[i] = (gyro_sum[i] / n) as f32;
        }
        // Leave gravity in place on Z; mounting inversion flips its sign
        let gravity = if params.imu_upside_down {
            -ACCEL_CLIP
        } else {
            ACCEL_CLIP
        };
        accel_offset[2] -= gravity;

        self.offsets = CalibrationOffsets {
            accel_offset,
            gyro_offset,
        };
        log::info!(
            "Estimator: recalibrated over {} samples, accel_offset={:?}, gyro_offset={:?}",
            samples,
            self.offsets.accel_offset,
            self.offsets.gyro_offset
        );
        self.filter = None;
        Ok(self.offsets)
    }
}

/// Subtract bias offsets and undo an upside-down mounting.
///
/// Inversion negates the accelerometer Y/Z axes and the gyro X axis — a
/// 180° rotation about the robot's forward axis — so the tilt computation
/// sees the sensor as if it were mounted upright.
fn correct_sample(sample: ImuSample, offsets: &CalibrationOffsets, upside_down: bool) -> ImuSample {
    let mut accel = [0.0_f32; 3];
    let mut gyro = [0.0_f32; 3];
    for i in 0..3 {
        accel[i] = sample.accel[i] - offsets.accel_offset[i];
        gyro[i] = sample.gyro[i] - offsets.gyro_offset[i];
    }

    if upside_down {
        accel[1] = -accel[1];
        accel[2] = -accel[2];
        gyro[0] = -gyro[0];
    }

    for v in accel.iter_mut() {
        *v = v.clamp(-ACCEL_CLIP, ACCEL_CLIP);
    }

    ImuSample::new(accel, gyro)
}

/// Accelerometer-only tilt estimate in degrees
fn accel_tilt_degrees(accel: [f32; 3]) -> f32 {
    let [ax, ay, az] = accel;
    (-ax).atan2((ay * ay + az * az).sqrt()).to_degrees()
}

/// Wrap an angle to (-180, 180]
fn normalize_angle_degrees(angle: f32) -> f32 {
    let mut result = angle;
    while result > 180.0 {
        result -= 360.0;
    }
    while result <= -180.0 {
        result += 360.0;
    }
    result
}
