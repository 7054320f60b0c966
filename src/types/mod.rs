//! Common data types

pub mod imu;
pub mod motion;

pub use imu::*;
pub use motion::*;
