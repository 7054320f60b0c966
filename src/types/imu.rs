//! IMU data types

/// One raw inertial sample, read fresh each control cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Accelerometer data (m/s²)
    pub accel: [f32; 3], // x, y, z
    /// Gyroscope data (rad/s)
    pub gyro: [f32; 3], // x, y, z
}

impl ImuSample {
    /// Create new IMU sample
    pub fn new(accel: [f32; 3], gyro: [f32; 3]) -> Self {
        Self { accel, gyro }
    }

    /// Create zero sample
    pub fn zero() -> Self {
        Self {
            accel: [0.0, 0.0, 0.0],
            gyro: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for ImuSample {
    fn default() -> Self {
        Self::zero()
    }
}

/// Filtered orientation produced by the estimator once per cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    /// Filtered roll angle in degrees, normalized to (-180, 180]
    pub roll: f32,
    /// Filtered angular velocity about the roll axis in deg/s
    pub angular_velocity: f32,
}

/// Per-axis accelerometer and gyroscope bias, plus mounting orientation.
///
/// Loaded once at startup and held constant for the session unless an
/// explicit recalibration is performed. Accelerometer offsets are in m/s²,
/// gyroscope offsets in deg/s (the estimator's internal rate unit).
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CalibrationOffsets {
    /// Accelerometer bias (m/s²)
    pub accel_offset: [f32; 3],
    /// Gyroscope bias (deg/s)
    pub gyro_offset: [f32; 3],
}
