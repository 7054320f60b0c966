//! Santulan - balance control daemon for a two-wheeled inverted-pendulum
//! robot
//!
//! The core is a fixed-rate control loop: IMU sample → orientation
//! estimator → PID regulator → motor command mapper → motor driver, with
//! an unconditional tilt safety cutoff and a concurrent telemetry/tuning
//! channel that reads and updates the live parameters without corrupting
//! control state.
//!
//! Hardware access is behind the [`drivers::ImuSensor`] and
//! [`drivers::MotorDriver`] collaborator traits; the crate ships mock and
//! simulated implementations, real buses live out of tree.

pub mod app;
pub mod balance;
pub mod config;
pub mod drivers;
pub mod error;
pub mod estimator;
pub mod shared;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use config::BalanceConfig;
pub use error::{Error, Result};
