//! IMU sensor collaborator trait

use crate::error::Result;

/// Inertial measurement source.
///
/// Implementations talk to the actual sensor bus; the core only demands
/// fresh 3-vectors on request. Any read failure is fatal for the balancing
/// session — the caller must not substitute stale or zero data.
pub trait ImuSensor: Send {
    /// Read acceleration (x, y, z) in m/s²
    fn read_accel(&mut self) -> Result<[f32; 3]>;

    /// Read angular rate (x, y, z) in rad/s
    fn read_gyro(&mut self) -> Result<[f32; 3]>;
}
