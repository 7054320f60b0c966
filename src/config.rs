//! Tunable parameter set for the balance controller
//!
//! Loads and saves the live configuration from a TOML file. Every key the
//! control loop consults each cycle lives here; missing keys take the
//! documented defaults and unrecognized keys survive a load/save round trip
//! untouched.

use crate::error::{Error, Result};
use crate::types::CalibrationOffsets;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Live tunable parameters consulted by the control loop every cycle.
///
/// Field names map to the upper-case keys of the configuration file
/// (`P_GAIN`, `MOTOR_DEADBAND`, ...). The set is shared between the control
/// loop and the tuning channel through [`crate::shared::SharedParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Proportional gain
    #[serde(rename = "P_GAIN")]
    pub p_gain: f32,

    /// Integral gain
    #[serde(rename = "I_GAIN")]
    pub i_gain: f32,

    /// Derivative gain (applied to measured angular velocity)
    #[serde(rename = "D_GAIN")]
    pub d_gain: f32,

    /// Integral accumulator clamp, anti-windup bound (independent of I_GAIN)
    #[serde(rename = "MAX_I_TERM")]
    pub max_i_term: f32,

    /// Target angle in degrees (0 = upright)
    #[serde(rename = "SETPOINT")]
    pub setpoint: f32,

    /// Below this commanded speed the motor is stopped rather than buzzed (0-100)
    #[serde(rename = "MOTOR_DEADBAND")]
    pub motor_deadband: f32,

    /// Maximum commanded motor speed (0-100)
    #[serde(rename = "MAX_MOTOR_SPEED")]
    pub max_motor_speed: f32,

    /// Safety cutoff angle in degrees; exceeding it ends the session
    #[serde(rename = "SAFE_TILT_LIMIT")]
    pub safe_tilt_limit: f32,

    /// Percentage speed boost applied when the drive direction reverses
    #[serde(rename = "DIRECTION_CHANGE_BOOST")]
    pub direction_change_boost: f32,

    /// Outputs below this magnitude are treated as zero (0-100)
    #[serde(rename = "ZERO_THRESHOLD")]
    pub zero_threshold: f32,

    /// Control loop sampling period in seconds
    #[serde(rename = "SAMPLE_TIME")]
    pub sample_time: f32,

    /// Complementary filter coefficient, (0,1): higher = more responsive
    #[serde(rename = "IMU_FILTER_ALPHA")]
    pub imu_filter_alpha: f32,

    /// True when the IMU is physically mounted upside down
    #[serde(rename = "IMU_UPSIDE_DOWN")]
    pub imu_upside_down: bool,

    /// Sensor bias offsets, loaded once at startup
    pub calibration: CalibrationOffsets,

    /// Unrecognized keys, preserved across load/save
    #[serde(flatten)]
    pub extras: BTreeMap<String, toml::Value>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            p_gain: 5.0,
            i_gain: 0.1,
            d_gain: 1.0,
            max_i_term: 20.0,
            setpoint: 0.0,
            motor_deadband: 60.0,
            max_motor_speed: 100.0,
            safe_tilt_limit: 45.0,
            direction_change_boost: 10.0,
            zero_threshold: 0.1,
            sample_time: 0.01,
            imu_filter_alpha: 0.3,
            imu_upside_down: true,
            calibration: CalibrationOffsets::default(),
            extras: BTreeMap::new(),
        }
    }
}

impl BalanceConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing keys default; the result is validated before being returned
    /// so a malformed file never reaches the control loop.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            Error::ConfigPersistence(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: BalanceConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is absent.
    ///
    /// A missing file is created with the default values so subsequent runs
    /// and the tuning channel work against the same store.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            log::info!(
                "Config: {} not found, writing defaults",
                path.as_ref().display()
            );
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents).map_err(|e| {
            Error::ConfigPersistence(format!(
                "failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Validate parameter ranges.
    ///
    /// Called on load and before accepting any tuning update, so an
    /// out-of-range value never replaces a good one.
    pub fn validate(&self) -> Result<()> {
        fn check_finite(name: &str, value: f32) -> Result<()> {
            if value.is_finite() {
                Ok(())
            } else {
                Err(Error::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )))
            }
        }
        fn check_non_negative(name: &str, value: f32) -> Result<()> {
            check_finite(name, value)?;
            if value >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidParameter(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )))
            }
        }
        fn check_percent(name: &str, value: f32) -> Result<()> {
            check_finite(name, value)?;
            if (0.0..=100.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidParameter(format!(
                    "{} must be in [0, 100], got {}",
                    name, value
                )))
            }
        }

        check_non_negative("P_GAIN", self.p_gain)?;
        check_non_negative("I_GAIN", self.i_gain)?;
        check_non_negative("D_GAIN", self.d_gain)?;
        check_non_negative("MAX_I_TERM", self.max_i_term)?;
        check_finite("SETPOINT", self.setpoint)?;
        check_percent("MOTOR_DEADBAND", self.motor_deadband)?;
        check_percent("MAX_MOTOR_SPEED", self.max_motor_speed)?;
        check_non_negative("DIRECTION_CHANGE_BOOST", self.direction_change_boost)?;
        check_percent("ZERO_THRESHOLD", self.zero_threshold)?;

        check_finite("SAFE_TILT_LIMIT", self.safe_tilt_limit)?;
        if !(self.safe_tilt_limit > 0.0 && self.safe_tilt_limit <= 180.0) {
            return Err(Error::InvalidParameter(format!(
                "SAFE_TILT_LIMIT must be in (0, 180], got {}",
                self.safe_tilt_limit
            )));
        }

        check_finite("SAMPLE_TIME", self.sample_time)?;
        if self.sample_time <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "SAMPLE_TIME must be > 0, got {}",
                self.sample_time
            )));
        }

        check_finite("IMU_FILTER_ALPHA", self.imu_filter_alpha)?;
        if !(self.imu_filter_alpha > 0.0 && self.imu_filter_alpha < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "IMU_FILTER_ALPHA must be in (0, 1), got {}",
                self.imu_filter_alpha
            )));
        }

        for (axis, v) in ["x", "y", "z"].iter().zip(self.calibration.accel_offset) {
            check_finite(&format!("calibration.accel_offset.{}", axis), v)?;
        }
        for (axis, v) in ["x", "y", "z"].iter().zip(self.calibration.gyro_offset) {
            check_finite(&format!("calibration.gyro_offset.{}", axis), v)?;
        }

        Ok(())
    }
}
