//! Collaborator driver traits and in-crate implementations

pub mod imu;
pub mod mock;
pub mod motor;
pub mod sim;

pub use imu::ImuSensor;
pub use motor::{Drive, DriveLayout, MotorDriver};
